//! Item classification and field extraction.
//!
//! QTI items in the wild either declare a Common Cartridge profile in their
//! metadata or only show their interaction kind through the presentation
//! markup. Classification reads both signals once into [`ItemSignals`] and
//! walks [`RULES`] top to bottom; the first matching rule decides the
//! response type. Profile rules come first, so a declared profile always
//! beats whatever the markup looks like.
//!
//! Nothing here fails. Every missing piece resolves to `"N/A"`, an empty
//! option list or [`ResponseType::Unknown`].

use crate::model::{Choice, CorrectAnswer, Question, ResponseType, NOT_AVAILABLE};
use crate::sanitize::sanitize_or_default;
use crate::xml::Element;

pub const PROFILE_FIELD: &str = "cc_profile";
pub const WEIGHTING_FIELD: &str = "cc_weighting";

pub const MULTIPLE_CHOICE_PROFILE: &str = "cc.multiple_choice.v0p1";
pub const FILL_IN_BLANK_PROFILE: &str = "cc.fib.v0p1";
pub const ESSAY_PROFILE: &str = "cc.essay.v0p1";

/// Score reported for essay items regardless of any weighting.
pub const ESSAY_SCORE: &str = "Manual grading";
/// Correct answer reported for essay items.
pub const ESSAY_ANSWER: &str = "Manual scoring required.";

/// A `qtimetadatafield` label/entry pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataField {
    pub label: String,
    pub entry: Option<String>,
}

/// Everything the classification rules look at.
#[derive(Debug, Clone, Default)]
pub struct ItemSignals<'a> {
    /// Declared `cc_profile`, if any.
    pub profile: Option<&'a str>,
    /// First `render_choice` under the presentation.
    pub choice_render: Option<&'a Element>,
    /// Whether the presentation has a `response_str`.
    pub has_text_response: bool,
}

impl<'a> ItemSignals<'a> {
    pub fn read(fields: &'a [MetadataField], presentation: Option<&'a Element>) -> Self {
        Self {
            profile: field_entry(fields, PROFILE_FIELD),
            choice_render: presentation.and_then(|p| p.find("render_choice")),
            has_text_response: presentation.is_some_and(|p| p.find("response_str").is_some()),
        }
    }

    fn profile_is(&self, profile: &str) -> bool {
        self.profile == Some(profile)
    }
}

/// One classification rule.
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&ItemSignals<'_>) -> bool,
    pub response_type: ResponseType,
}

/// Classification rules in precedence order.
pub const RULES: &[Rule] = &[
    Rule {
        name: "profile:multiple_choice",
        matches: declares_multiple_choice,
        response_type: ResponseType::MultipleChoice,
    },
    Rule {
        name: "profile:fib",
        matches: declares_fill_in_blank,
        response_type: ResponseType::FillInBlank,
    },
    Rule {
        name: "profile:essay",
        matches: declares_essay,
        response_type: ResponseType::Essay,
    },
    Rule {
        name: "structure:render_choice",
        matches: renders_choices,
        response_type: ResponseType::MultipleChoice,
    },
    Rule {
        name: "structure:response_str",
        matches: accepts_free_text,
        response_type: ResponseType::FillInBlank,
    },
];

fn declares_multiple_choice(signals: &ItemSignals<'_>) -> bool {
    signals.profile_is(MULTIPLE_CHOICE_PROFILE)
}

fn declares_fill_in_blank(signals: &ItemSignals<'_>) -> bool {
    signals.profile_is(FILL_IN_BLANK_PROFILE)
}

fn declares_essay(signals: &ItemSignals<'_>) -> bool {
    signals.profile_is(ESSAY_PROFILE)
}

fn renders_choices(signals: &ItemSignals<'_>) -> bool {
    signals.choice_render.is_some()
}

fn accepts_free_text(signals: &ItemSignals<'_>) -> bool {
    signals.has_text_response
}

/// The first rule matching the signals, if any.
pub fn matching_rule(signals: &ItemSignals<'_>) -> Option<&'static Rule> {
    RULES.iter().find(|rule| (rule.matches)(signals))
}

/// Response type for the signals; [`ResponseType::Unknown`] when no rule matches.
pub fn detect_response_type(signals: &ItemSignals<'_>) -> ResponseType {
    matching_rule(signals)
        .map(|rule| rule.response_type)
        .unwrap_or(ResponseType::Unknown)
}

/// Normalize one QTI `item` element into a [`Question`].
pub fn classify(item: &Element) -> Question {
    let item_identifier = item
        .attr("ident")
        .map(str::trim)
        .filter(|ident| !ident.is_empty())
        .unwrap_or(NOT_AVAILABLE)
        .to_string();
    let presentation = item.child("presentation");
    let question_text = question_text(presentation);
    let fields = metadata_fields(item);
    let conditions = response_conditions(item);
    let signals = ItemSignals::read(&fields, presentation);
    let score = resolve_score(&fields, &conditions);

    let rule = matching_rule(&signals);
    let response_type = rule
        .map(|rule| rule.response_type)
        .unwrap_or(ResponseType::Unknown);
    tracing::debug!(
        item = %item_identifier,
        rule = rule.map(|r| r.name).unwrap_or("none"),
        %response_type,
        "classified item"
    );

    let mut question = Question {
        item_identifier,
        question_text,
        response_type,
        options: Vec::new(),
        correct_answer: None,
        score,
    };

    match response_type {
        ResponseType::MultipleChoice => {
            question.options = signals
                .choice_render
                .map(extract_choices)
                .unwrap_or_default();
            question.correct_answer = Some(multiple_choice_answer(&conditions, &question.options));
        }
        ResponseType::FillInBlank => {
            let answer = conditions
                .first()
                .and_then(|condition| equality_target(condition))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            question.correct_answer = Some(CorrectAnswer::Text(answer));
        }
        ResponseType::Essay => {
            question.score = ESSAY_SCORE.to_string();
            question.correct_answer = Some(CorrectAnswer::Text(ESSAY_ANSWER.to_string()));
        }
        ResponseType::Unknown => {}
    }

    question
}

/// All `qtimetadatafield` entries of an item, across every metadata block.
pub fn metadata_fields(item: &Element) -> Vec<MetadataField> {
    item.children("itemmetadata")
        .into_iter()
        .flat_map(|metadata| metadata.children("qtimetadata"))
        .flat_map(|qti| qti.children("qtimetadatafield"))
        .filter_map(|field| {
            let label = field.child("fieldlabel").and_then(Element::text)?;
            let entry = field.child("fieldentry").and_then(Element::text);
            Some(MetadataField { label, entry })
        })
        .collect()
}

fn field_entry<'a>(fields: &'a [MetadataField], label: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|field| field.label == label)
        .and_then(|field| field.entry.as_deref())
}

fn response_conditions(item: &Element) -> Vec<&Element> {
    item.child("resprocessing")
        .map(|processing| processing.children("respcondition"))
        .unwrap_or_default()
}

fn question_text(presentation: Option<&Element>) -> String {
    let mattext = presentation.and_then(|p| {
        p.path(&["material", "mattext"])
            .or_else(|| p.path(&["flow", "material", "mattext"]))
    });
    sanitize_or_default(mattext.and_then(Element::inner_text).as_deref())
}

/// Weighting from metadata, else the first condition's `setvar`, else `"N/A"`.
fn resolve_score(fields: &[MetadataField], conditions: &[&Element]) -> String {
    if let Some(weight) = field_entry(fields, WEIGHTING_FIELD) {
        return weight.to_string();
    }
    conditions
        .first()
        .and_then(|condition| condition.child("setvar"))
        .and_then(Element::text)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Options in document order, including labels wrapped in `flow_label`.
fn extract_choices(render_choice: &Element) -> Vec<Choice> {
    render_choice
        .elements()
        .flat_map(|element| match element.name() {
            "response_label" => vec![element],
            "flow_label" => element.children("response_label"),
            _ => Vec::new(),
        })
        .map(|label| {
            let identifier = label
                .attr("ident")
                .map(str::trim)
                .filter(|ident| !ident.is_empty())
                .unwrap_or(NOT_AVAILABLE)
                .to_string();
            let mattext = label
                .path(&["material", "mattext"])
                .or_else(|| label.find("mattext"));
            let text = sanitize_or_default(mattext.and_then(Element::inner_text).as_deref());
            Choice { identifier, text }
        })
        .collect()
}

/// The `varequal` value a response condition tests for.
fn equality_target(condition: &Element) -> Option<String> {
    let conditionvar = condition.child("conditionvar")?;
    conditionvar
        .child("varequal")
        .or_else(|| conditionvar.find("varequal"))
        .and_then(Element::text)
}

fn multiple_choice_answer(conditions: &[&Element], options: &[Choice]) -> CorrectAnswer {
    let Some(condition) = conditions
        .iter()
        .find(|condition| condition.child("setvar").is_some())
    else {
        return CorrectAnswer::unresolved_choice();
    };

    // A missing target must not match an option whose ident also defaulted.
    let Some(id) = equality_target(condition) else {
        return CorrectAnswer::unresolved_choice();
    };
    let text = options
        .iter()
        .find(|option| option.identifier == id)
        .map(|option| option.text.clone())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    CorrectAnswer::Choice { id, text }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;

    fn item(xml: &str) -> Element {
        parse_document(xml).unwrap()
    }

    fn metadata(fields: &[(&str, &str)]) -> String {
        let fields: String = fields
            .iter()
            .map(|(label, entry)| {
                format!(
                    "<qtimetadatafield><fieldlabel>{label}</fieldlabel>\
                     <fieldentry>{entry}</fieldentry></qtimetadatafield>"
                )
            })
            .collect();
        format!("<itemmetadata><qtimetadata>{fields}</qtimetadata></itemmetadata>")
    }

    const CHOICES: &str = r#"
        <response_lid ident="response1" rcardinality="Single">
          <render_choice>
            <response_label ident="A"><material><mattext texttype="text/html">&lt;p&gt;Paris&lt;/p&gt;</mattext></material></response_label>
            <response_label ident="B"><material><mattext>Rome</mattext></material></response_label>
          </render_choice>
        </response_lid>"#;

    const CORRECT_A: &str = r#"
        <resprocessing>
          <outcomes><decvar maxvalue="100" minvalue="0" varname="SCORE" vartype="Decimal"/></outcomes>
          <respcondition continue="Yes"><conditionvar><other/></conditionvar></respcondition>
          <respcondition continue="No">
            <conditionvar><varequal respident="response1"> A </varequal></conditionvar>
            <setvar action="Set" varname="SCORE">100</setvar>
          </respcondition>
        </resprocessing>"#;

    fn multiple_choice_item(meta: &str) -> Element {
        item(&format!(
            r#"<item ident="q1" title="Capitals">{meta}
                 <presentation>
                   <material><mattext texttype="text/html">&lt;p&gt;Capital of &lt;b&gt;France&lt;/b&gt;?&lt;/p&gt;</mattext></material>
                   {CHOICES}
                 </presentation>
                 {CORRECT_A}
               </item>"#
        ))
    }

    #[test]
    fn multiple_choice_by_profile() {
        let meta = metadata(&[
            ("cc_profile", "cc.multiple_choice.v0p1"),
            ("cc_weighting", "2"),
        ]);
        let q = classify(&multiple_choice_item(&meta));
        assert_eq!(q.item_identifier, "q1");
        assert_eq!(q.question_text, "Capital of France?");
        assert_eq!(q.response_type, ResponseType::MultipleChoice);
        assert_eq!(
            q.options,
            vec![
                Choice {
                    identifier: "A".into(),
                    text: "Paris".into()
                },
                Choice {
                    identifier: "B".into(),
                    text: "Rome".into()
                },
            ]
        );
        assert_eq!(
            q.correct_answer,
            Some(CorrectAnswer::Choice {
                id: "A".into(),
                text: "Paris".into()
            })
        );
        assert_eq!(q.score, "2");
    }

    #[test]
    fn multiple_choice_by_structure_alone() {
        let q = classify(&multiple_choice_item(""));
        assert_eq!(q.response_type, ResponseType::MultipleChoice);
        assert_eq!(q.options.len(), 2);
        // The first condition has no setvar, so the fallback score is absent.
        assert_eq!(q.score, "N/A");
        assert_eq!(
            q.correct_answer,
            Some(CorrectAnswer::Choice {
                id: "A".into(),
                text: "Paris".into()
            })
        );
    }

    #[test]
    fn setvar_of_first_condition_is_the_fallback_score() {
        let q = classify(&item(
            r#"<item ident="q2">
                 <presentation><response_str ident="r"><render_fib/></response_str></presentation>
                 <resprocessing>
                   <respcondition>
                     <conditionvar><varequal respident="r">photosynthesis</varequal></conditionvar>
                     <setvar action="Set" varname="SCORE">5</setvar>
                   </respcondition>
                 </resprocessing>
               </item>"#,
        ));
        assert_eq!(q.response_type, ResponseType::FillInBlank);
        assert_eq!(q.score, "5");
        assert_eq!(
            q.correct_answer,
            Some(CorrectAnswer::Text("photosynthesis".into()))
        );
        assert!(q.options.is_empty());
    }

    #[test]
    fn unresolved_choice_id_keeps_id_with_placeholder_text() {
        let q = classify(&item(&format!(
            r#"<item ident="q3"><presentation>{CHOICES}</presentation>
                 <resprocessing><respcondition>
                   <conditionvar><varequal respident="response1">Z</varequal></conditionvar>
                   <setvar>1</setvar>
                 </respcondition></resprocessing></item>"#
        )));
        assert_eq!(
            q.correct_answer,
            Some(CorrectAnswer::Choice {
                id: "Z".into(),
                text: "N/A".into()
            })
        );
    }

    #[test]
    fn missing_equality_target_does_not_match_unnamed_option() {
        let q = classify(&item(
            r#"<item ident="q5"><presentation>
                 <response_lid ident="response1"><render_choice>
                   <response_label><material><mattext>Nameless</mattext></material></response_label>
                 </render_choice></response_lid>
               </presentation>
               <resprocessing><respcondition>
                 <conditionvar><other/></conditionvar>
                 <setvar>1</setvar>
               </respcondition></resprocessing></item>"#,
        ));
        assert_eq!(q.options[0].identifier, "N/A");
        assert_eq!(q.correct_answer, Some(CorrectAnswer::unresolved_choice()));
    }

    #[test]
    fn no_setting_condition_yields_placeholder_answer() {
        let q = classify(&item(&format!(
            r#"<item ident="q4"><presentation>{CHOICES}</presentation>
                 <resprocessing><respcondition>
                   <conditionvar><varequal respident="response1">A</varequal></conditionvar>
                   <displayfeedback linkrefid="fb"/>
                 </respcondition></resprocessing></item>"#
        )));
        assert_eq!(q.correct_answer, Some(CorrectAnswer::unresolved_choice()));
    }

    #[test]
    fn essay_profile_overrides_score_and_structure() {
        let meta = metadata(&[("cc_profile", "cc.essay.v0p1"), ("cc_weighting", "10")]);
        let q = classify(&item(&format!(
            r#"<item ident="e1">{meta}
                 <presentation>
                   <material><mattext>Discuss.</mattext></material>
                   <response_str ident="r" rcardinality="Single"><render_fib/></response_str>
                 </presentation>
               </item>"#
        )));
        assert_eq!(q.response_type, ResponseType::Essay);
        assert_eq!(q.score, "Manual grading");
        assert_eq!(
            q.correct_answer,
            Some(CorrectAnswer::Text("Manual scoring required.".into()))
        );
    }

    #[test]
    fn declared_profile_beats_conflicting_structure() {
        let meta = metadata(&[("cc_profile", "cc.fib.v0p1")]);
        let q = classify(&multiple_choice_item(&meta));
        assert_eq!(q.response_type, ResponseType::FillInBlank);
        assert!(q.options.is_empty());
        // First condition is the <other/> one, which has no varequal.
        assert_eq!(q.correct_answer, Some(CorrectAnswer::Text("N/A".into())));
    }

    #[test]
    fn unrecognized_profile_falls_back_to_structure() {
        let meta = metadata(&[("cc_profile", "cc.true_false.v0p1")]);
        let q = classify(&multiple_choice_item(&meta));
        assert_eq!(q.response_type, ResponseType::MultipleChoice);
    }

    #[test]
    fn unknown_item_gets_defaults() {
        let q = classify(&item("<item><presentation><material/></presentation></item>"));
        assert_eq!(q.item_identifier, "N/A");
        assert_eq!(q.question_text, "N/A");
        assert_eq!(q.response_type, ResponseType::Unknown);
        assert!(q.options.is_empty());
        assert_eq!(q.correct_answer, None);
        assert_eq!(q.score, "N/A");
    }

    #[test]
    fn flow_layout_is_understood() {
        let q = classify(&item(
            r#"<item ident="f1">
                 <presentation><flow>
                   <material><mattext>Pick one</mattext></material>
                   <response_lid ident="r"><render_choice>
                     <flow_label><response_label ident="x"><material><mattext>X</mattext></material></response_label></flow_label>
                     <flow_label><response_label ident="y"><flow_mat><material><mattext>Y</mattext></material></flow_mat></response_label></flow_label>
                   </render_choice></response_lid>
                 </flow></presentation>
               </item>"#,
        ));
        assert_eq!(q.question_text, "Pick one");
        assert_eq!(q.response_type, ResponseType::MultipleChoice);
        let texts: Vec<&str> = q.options.iter().map(|o| o.text.as_str()).collect();
        assert_eq!(texts, vec!["X", "Y"]);
    }

    #[test]
    fn choice_defaults_and_duplicates_are_preserved() {
        let q = classify(&item(
            r#"<item><presentation><response_lid><render_choice>
                 <response_label ident="A"/>
                 <response_label><material><mattext>no id</mattext></material></response_label>
                 <response_label ident="A"><material><mattext>again</mattext></material></response_label>
               </render_choice></response_lid></presentation></item>"#,
        ));
        let pairs: Vec<(&str, &str)> = q
            .options
            .iter()
            .map(|o| (o.identifier.as_str(), o.text.as_str()))
            .collect();
        assert_eq!(pairs, vec![("A", "N/A"), ("N/A", "no id"), ("A", "again")]);
    }

    #[test]
    fn rules_are_ordered_profile_first() {
        let names: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "profile:multiple_choice",
                "profile:fib",
                "profile:essay",
                "structure:render_choice",
                "structure:response_str",
            ]
        );
    }

    #[test]
    fn each_rule_matches_its_own_signal() {
        let fib = ItemSignals {
            has_text_response: true,
            ..Default::default()
        };
        assert_eq!(detect_response_type(&fib), ResponseType::FillInBlank);

        let essay = ItemSignals {
            profile: Some(ESSAY_PROFILE),
            has_text_response: true,
            ..Default::default()
        };
        assert_eq!(detect_response_type(&essay), ResponseType::Essay);

        let nothing = ItemSignals::default();
        assert_eq!(detect_response_type(&nothing), ResponseType::Unknown);
        assert!(matching_rule(&nothing).is_none());
    }

    #[test]
    fn metadata_fields_are_collected_across_blocks() {
        let el = item(
            r#"<item>
                 <itemmetadata><qtimetadata>
                   <qtimetadatafield><fieldlabel>cc_profile</fieldlabel><fieldentry>cc.fib.v0p1</fieldentry></qtimetadatafield>
                 </qtimetadata><qtimetadata>
                   <qtimetadatafield><fieldlabel>cc_weighting</fieldlabel></qtimetadatafield>
                 </qtimetadata></itemmetadata>
               </item>"#,
        );
        let fields = metadata_fields(&el);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].entry.as_deref(), Some("cc.fib.v0p1"));
        assert_eq!(fields[1].entry, None);
    }
}
