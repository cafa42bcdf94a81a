//! Schema-shaped generative output.
//!
//! The model is asked for strict JSON but is not guaranteed to obey, so
//! everything here is validated after the fact. Two shapes exist: the
//! question set (`{"Questions": [...]}`, where the list is sometimes
//! nested one extra level as an encoded string) and the evaluation
//! verdict (letter grade, explanation, per-criterion sub-scores in
//! `[1, 100]` or null if not assessed).

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Letter grade from the closed scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "E" => Ok(Grade::E),
            "F" => Ok(Grade::F),
            other => Err(format!("'{}' is not a grade letter", other)),
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::E => "E",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// The `score` field of an evaluation. Normally a letter grade; a
/// numeric-looking string is coerced to an integer, everything else is
/// a schema violation (which triggers a retry upstream).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Grade(Grade),
    Points(i64),
}

impl Serialize for Score {
    fn serialize<Se: Serializer>(&self, serializer: Se) -> Result<Se::Ok, Se::Error> {
        match self {
            Score::Grade(grade) => serializer.serialize_str(&grade.to_string()),
            Score::Points(points) => serializer.serialize_i64(*points),
        }
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<De: Deserializer<'de>>(deserializer: De) -> Result<Self, De::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        match value {
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Score::Points)
                .ok_or_else(|| De::Error::custom("score must be an integer")),
            serde_json::Value::String(s) => {
                if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
                    s.parse::<i64>()
                        .map(Score::Points)
                        .map_err(De::Error::custom)
                } else {
                    Grade::from_str(&s).map(Score::Grade).map_err(De::Error::custom)
                }
            }
            other => Err(De::Error::custom(format!(
                "score must be a grade letter or integer, got {}",
                other
            ))),
        }
    }
}

/// Evaluation verdict for one answered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: Score,
    pub explanation: String,
    /// Model answer (technical evaluations).
    #[serde(default, rename = "model", skip_serializing_if = "Option::is_none")]
    pub model_answer: Option<String>,
    /// Question intent (behavioral evaluations).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intention: Option<String>,
    /// Per-criterion sub-scores; null means the criterion was not
    /// assessed in the answer.
    #[serde(default)]
    pub criteria_scores: BTreeMap<String, Option<i64>>,
}

impl Evaluation {
    /// Check the sub-score invariant: every assessed criterion is an
    /// integer in `[1, 100]`.
    pub fn validate(&self) -> Result<(), String> {
        for (criterion, value) in &self.criteria_scores {
            if let Some(points) = value {
                if !(1..=100).contains(points) {
                    return Err(format!(
                        "criteria score '{}' out of range: {}",
                        criterion, points
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Parse a raw model response as an evaluation verdict.
pub fn parse_evaluation(raw: &str) -> Result<Evaluation, String> {
    let evaluation: Evaluation = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    evaluation.validate()?;
    Ok(evaluation)
}

/// Parse a raw model response as a question list.
///
/// Accepts two shapes for the `Questions` value: a list, or a string
/// that itself decodes to a list (the model sometimes nests one extra
/// level of encoding).
pub fn parse_question_set(raw: &str) -> Result<Vec<String>, String> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    let questions = value
        .get("Questions")
        .ok_or_else(|| "missing 'Questions' field".to_string())?;

    match questions {
        serde_json::Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| "non-string entry in question list".to_string())
            })
            .collect(),
        serde_json::Value::String(encoded) => {
            serde_json::from_str::<Vec<String>>(encoded).map_err(|e| e.to_string())
        }
        _ => Err("'Questions' is neither a list nor an encoded list".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_set_plain_list() {
        let raw = r#"{"Questions": ["Q1", "Q2"]}"#;
        assert_eq!(parse_question_set(raw).unwrap(), vec!["Q1", "Q2"]);
    }

    #[test]
    fn test_question_set_double_encoded() {
        let raw = "{\"Questions\": \"[\\\"Q1\\\",\\\"Q2\\\"]\"}";
        assert_eq!(parse_question_set(raw).unwrap(), vec!["Q1", "Q2"]);
    }

    #[test]
    fn test_question_set_rejects_other_shapes() {
        assert!(parse_question_set(r#"{"Questions": 7}"#).is_err());
        assert!(parse_question_set(r#"{"Other": []}"#).is_err());
        assert!(parse_question_set("not json at all").is_err());
    }

    #[test]
    fn test_numeric_string_score_coerced() {
        let raw = r#"{"score": "85", "explanation": "solid"}"#;
        let eval = parse_evaluation(raw).unwrap();
        assert_eq!(eval.score, Score::Points(85));
    }

    #[test]
    fn test_letter_grade_stays_letter() {
        let raw = r#"{"score": "B", "explanation": "partial"}"#;
        let eval = parse_evaluation(raw).unwrap();
        assert_eq!(eval.score, Score::Grade(Grade::B));
    }

    #[test]
    fn test_score_outside_closed_set_rejected() {
        let raw = r#"{"score": "G", "explanation": ""}"#;
        assert!(parse_evaluation(raw).is_err());
    }

    #[test]
    fn test_null_criteria_allowed() {
        let raw = r#"{
            "score": "A",
            "explanation": "good",
            "model": "a model answer",
            "criteria_scores": {
                "problem_solving": 92,
                "collaboration_communication": null
            }
        }"#;
        let eval = parse_evaluation(raw).unwrap();
        assert_eq!(eval.criteria_scores["problem_solving"], Some(92));
        assert_eq!(eval.criteria_scores["collaboration_communication"], None);
    }

    #[test]
    fn test_criteria_out_of_range_rejected() {
        let raw = r#"{
            "score": "A",
            "explanation": "good",
            "criteria_scores": { "adaptability": 0 }
        }"#;
        assert!(parse_evaluation(raw).is_err());
        let raw = r#"{
            "score": "A",
            "explanation": "good",
            "criteria_scores": { "adaptability": 101 }
        }"#;
        assert!(parse_evaluation(raw).is_err());
    }

    #[test]
    fn test_score_roundtrips_through_serde() {
        let grade = serde_json::to_string(&Score::Grade(Grade::C)).unwrap();
        assert_eq!(grade, "\"C\"");
        let points = serde_json::to_string(&Score::Points(85)).unwrap();
        assert_eq!(points, "85");
    }
}
