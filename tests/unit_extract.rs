// Robustness tests for the response extractor.
//
// The extractor is fed attacker-influenced model output, so these lean on
// hostile shapes: fences with prose, deep nesting, braces hidden in
// strings, truncation, and combinations of all of the above. The property
// under test: any decoration of a valid object still yields that object,
// and nothing ever panics.

use contentshield::extract::extract_json;
use serde_json::json;

fn score_object() -> serde_json::Value {
    json!({
        "toxicity_score": 72,
        "hate_speech_score": 10,
        "profanity_score": 80,
        "threat_score": 0,
        "violence_score": 5,
        "sexual_score": 0,
        "protected_group": false,
        "reasoning": "test"
    })
}

#[test]
fn decorations_preserve_the_object() {
    let body = score_object().to_string();
    let wrapped = [
        format!("```json\n{body}\n```"),
        format!("```\n{body}\n```"),
        format!("Sure! Here's the JSON you asked for:\n{body}"),
        format!("{body}\nLet me know if you need anything else."),
        format!("prefix text ```json\n{body}\n``` suffix text"),
    ];
    for text in &wrapped {
        let value = extract_json(text).unwrap_or_else(|| panic!("failed on: {text}"));
        assert_eq!(value, score_object(), "mismatch on: {text}");
    }
}

#[test]
fn trailing_comma_variants_preserve_the_object() {
    let value = extract_json(
        r#"{"toxicity_score": 72, "reasoning": "ok", "tags": ["a", "b",],}"#,
    )
    .unwrap();
    assert_eq!(value["toxicity_score"], json!(72));
    assert_eq!(value["tags"], json!(["a", "b"]));
}

#[test]
fn adversarial_reasoning_text_cannot_break_matching() {
    // The reasoning field quotes braces, fences, and escape sequences.
    let text = "analysis: {\"reasoning\": \"user wrote ```{\\\"x\\\": 1,}``` and } {\", \"toxicity_score\": 3}";
    let value = extract_json(text).unwrap();
    assert_eq!(value["toxicity_score"], json!(3));
}

#[test]
fn picks_the_first_object_when_several_appear() {
    let text = r#"{"first": 1} {"second": 2}"#;
    let value = extract_json(text).unwrap();
    assert_eq!(value, json!({"first": 1}));
}

#[test]
fn truncated_output_is_a_clean_miss() {
    let body = score_object().to_string();
    // Cut at every char boundary below the full length: never a panic,
    // and never a full parse (the object is incomplete).
    for (cut, _) in body.char_indices().skip(1) {
        let truncated = &body[..cut];
        if let Some(value) = extract_json(truncated) {
            // A prefix can only parse if it happens to close a complete
            // value, which a cut object never does.
            panic!("truncated input unexpectedly parsed: {truncated} -> {value}");
        }
    }
}

#[test]
fn non_json_refusals_are_a_clean_miss() {
    for text in [
        "I'm sorry, I can't help with that.",
        "```\nno json here\n```",
        "{{{{",
        "}}}}",
        "",
        "   ",
    ] {
        assert!(extract_json(text).is_none(), "expected miss on: {text:?}");
    }
}
