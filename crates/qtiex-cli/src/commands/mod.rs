pub mod batch;
pub mod extract;
pub mod init;
pub mod inspect;
