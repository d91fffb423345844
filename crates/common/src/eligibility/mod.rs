//! Exam eligibility self-assessment
//!
//! Two flows share this module: the five-question quick check scored out of
//! 100, and the qualification diagnosis built from a candidate's education,
//! certificates, work history and skill competition awards.

use crate::errors::{AppError, Result};
use crate::interactions::{log_interaction, InteractionType};
use crate::metrics::record_assessment;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;

pub const ELIGIBLE_SCORE: u32 = 80;
pub const CONDITIONAL_SCORE: u32 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionKind {
    YesNo,
    Multiple,
}

#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: &'static str,
    pub question: &'static str,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<&'static [&'static str]>,
    pub required: bool,
}

const YES: &str = "yes";
const NO: &str = "no";
const YES_NO: &[&str] = &[YES, NO];

const EXPERIENCE_POINTS: &[(&str, u32)] = &[
    ("없음", 0),
    ("1년 미만", 10),
    ("1-3년", 15),
    ("3-5년", 20),
    ("5년 이상", 25),
];

const TRAINING_POINTS: &[(&str, u32)] = &[
    ("없음", 0),
    ("기초과정 이수", 10),
    ("심화과정 이수", 15),
    ("전문과정 이수", 20),
];

const EXPERIENCE_OPTIONS: &[&str] = &["없음", "1년 미만", "1-3년", "3-5년", "5년 이상"];
const TRAINING_OPTIONS: &[&str] = &["없음", "기초과정 이수", "심화과정 이수", "전문과정 이수"];

pub const QUESTIONS: &[Question] = &[
    Question {
        id: "1",
        question: "만 18세 이상이신가요?",
        kind: QuestionKind::YesNo,
        options: None,
        required: true,
    },
    Question {
        id: "2",
        question: "고등학교 졸업 이상의 학력이 있으신가요?",
        kind: QuestionKind::YesNo,
        options: None,
        required: true,
    },
    Question {
        id: "3",
        question: "관련 분야에서 몇 년간의 경험이 있으신가요?",
        kind: QuestionKind::Multiple,
        options: Some(EXPERIENCE_OPTIONS),
        required: true,
    },
    Question {
        id: "4",
        question: "필요한 자격증이나 교육과정을 이수하셨나요?",
        kind: QuestionKind::Multiple,
        options: Some(TRAINING_OPTIONS),
        required: true,
    },
    Question {
        id: "5",
        question: "신체적 제약이 있으신가요?",
        kind: QuestionKind::YesNo,
        options: None,
        required: true,
    },
];

impl Question {
    fn accepts(&self, answer: &str) -> bool {
        match self.kind {
            QuestionKind::YesNo => YES_NO.contains(&answer),
            QuestionKind::Multiple => self.options.is_some_and(|o| o.contains(&answer)),
        }
    }

    fn points(&self, answer: &str) -> u32 {
        let lookup = |table: &[(&str, u32)]| {
            table
                .iter()
                .find(|(option, _)| *option == answer)
                .map_or(0, |(_, points)| *points)
        };
        match self.id {
            "1" | "2" if answer == YES => 20,
            "3" => lookup(EXPERIENCE_POINTS),
            "4" => lookup(TRAINING_POINTS),
            "5" if answer == NO => 15,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentRequest {
    /// Answers keyed by question id
    pub answers: HashMap<String, String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub eligible: bool,
    pub message: &'static str,
    pub score: u32,
}

/// Score a completed questionnaire
pub fn assess(request: &AssessmentRequest) -> Result<Assessment> {
    let session = request.session_id.as_deref();
    log_interaction(
        InteractionType::EligibilityStart,
        session,
        Some(json!({ "answeredQuestions": request.answers.len() })),
    );

    let mut score = 0;
    for question in QUESTIONS {
        let answer = match request.answers.get(question.id).map(|a| a.trim()) {
            Some(answer) if !answer.is_empty() => answer,
            _ if question.required => {
                return Err(AppError::MissingField {
                    field: format!("answers.{}", question.id),
                })
            }
            _ => continue,
        };
        if !question.accepts(answer) {
            return Err(AppError::InvalidFormat {
                message: format!("'{}' is not a valid answer to question {}", answer, question.id),
            });
        }
        score += question.points(answer);
    }

    let assessment = if score >= ELIGIBLE_SCORE {
        Assessment {
            eligible: true,
            message: "응시 가능합니다!",
            score,
        }
    } else if score >= CONDITIONAL_SCORE {
        Assessment {
            eligible: true,
            message: "조건부 응시 가능합니다.",
            score,
        }
    } else {
        Assessment {
            eligible: false,
            message: "현재 응시 자격이 없습니다.",
            score,
        }
    };

    record_assessment("questionnaire", assessment.eligible);
    log_interaction(
        InteractionType::EligibilityComplete,
        session,
        Some(json!({
            "score": assessment.score,
            "eligible": assessment.eligible,
            "totalQuestions": QUESTIONS.len(),
        })),
    );

    Ok(assessment)
}

/// Qualification categories administered by KCA
pub const KCA_CATEGORIES: &[&str] = &[
    "정보통신기술사",
    "정보통신기사",
    "정보통신산업기사",
    "무선설비기사",
    "무선설비산업기사",
    "무선설비기능사",
    "방송통신기사",
    "방송통신산업기사",
    "방송통신기능사",
    "전파전자통신기사",
    "전파전자통신산업기사",
    "전파전자통신기능사",
    "통신선로산업기사",
    "통신선로기능사",
    "통신기기기능사",
    "통신설비기능장",
    "정보보안기사",
    "정보보안산업기사",
];

/// Categories whose written exam is waived for the diagnosed candidate
const WRITTEN_EXEMPT: &[&str] = &[
    "정보통신기사",
    "정보통신산업기사",
    "무선설비기사",
    "무선설비산업기사",
    "방송통신기사",
    "방송통신산업기사",
    "전파전자통신기사",
    "전파전자통신산업기사",
    "정보보안기사",
    "정보보안산업기사",
];

const REGIONAL_OFFICE_NOTE: &str =
    "과목면제 진단 결과와 일치하지 않는 경우 해당 지방본부로 문의하시기 바랍니다.";
const COMPETITION_NOTE: &str = "기능경기대회 입상자에 대한 검정과목 면제가 적용될 수 있습니다.";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    #[serde(default)]
    pub education: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationEntry {
    #[serde(default)]
    pub qualification_info: String,
    #[serde(default)]
    pub acquisition_date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperienceEntry {
    #[serde(default)]
    pub job_field: String,
    #[serde(default)]
    pub experience_period: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetitionEntry {
    #[serde(default)]
    pub competition: String,
    #[serde(default)]
    pub award_date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisRequest {
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub qualifications: Vec<QualificationEntry>,
    #[serde(default)]
    pub work_experience: Vec<WorkExperienceEntry>,
    #[serde(default)]
    pub skill_competitions: Vec<CompetitionEntry>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub eligible_categories: Vec<String>,
    pub exempt_subjects: Vec<String>,
    pub notes: Vec<String>,
}

fn filled(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// Produce the qualification diagnosis for the submitted history
pub fn diagnose(request: &DiagnosisRequest) -> Diagnosis {
    let education: Vec<&str> = request
        .education
        .iter()
        .filter_map(|e| filled(&e.education))
        .collect();
    let qualifications: Vec<&QualificationEntry> = request
        .qualifications
        .iter()
        .filter(|q| filled(&q.qualification_info).is_some())
        .collect();
    let work: Vec<&WorkExperienceEntry> = request
        .work_experience
        .iter()
        .filter(|w| filled(&w.job_field).is_some())
        .collect();
    let competitions: Vec<&CompetitionEntry> = request
        .skill_competitions
        .iter()
        .filter(|c| filled(&c.competition).is_some())
        .collect();

    let session = request.session_id.as_deref();
    log_interaction(
        InteractionType::EligibilityDiagnosisStart,
        session,
        Some(json!({
            "educationCount": education.len(),
            "qualificationCount": qualifications.len(),
            "workExperienceCount": work.len(),
            "skillCompetitionCount": competitions.len(),
        })),
    );

    let mut notes = Vec::new();
    match education.last() {
        Some(latest) => {
            notes.push(format!("학력 요건 충족: {}", latest));
            notes.push("관련 학과 이수 확인 필요".to_string());
        }
        None => notes.push("학력 정보가 입력되지 않았습니다.".to_string()),
    }
    for entry in &qualifications {
        match filled(&entry.acquisition_date) {
            Some(date) => notes.push(format!("보유 자격 확인: {} ({} 취득)", entry.qualification_info.trim(), date)),
            None => notes.push(format!("보유 자격 확인: {}", entry.qualification_info.trim())),
        }
    }
    for entry in &work {
        match filled(&entry.experience_period) {
            Some(period) => notes.push(format!("경력 인정 기간: {} ({})", period, entry.job_field.trim())),
            None => notes.push(format!("경력 기간 확인 필요: {}", entry.job_field.trim())),
        }
    }
    if !competitions.is_empty() {
        notes.push(format!("기능경기대회 입상 이력 {}건 확인", competitions.len()));
    }
    notes.push(REGIONAL_OFFICE_NOTE.to_string());
    notes.push(format!(
        "KCA에서 시행하는 {}개 종목에 대한 진단 결과입니다.",
        KCA_CATEGORIES.len()
    ));
    notes.push(COMPETITION_NOTE.to_string());

    let diagnosis = Diagnosis {
        eligible_categories: KCA_CATEGORIES.iter().map(|c| c.to_string()).collect(),
        exempt_subjects: WRITTEN_EXEMPT
            .iter()
            .map(|c| format!("{}: 필기시험 전과목 면제 (실기시험만 응시)", c))
            .collect(),
        notes,
    };

    record_assessment("diagnosis", !diagnosis.eligible_categories.is_empty());
    log_interaction(
        InteractionType::EligibilityDiagnosisComplete,
        session,
        Some(json!({
            "eligibleCategories": diagnosis.eligible_categories,
            "exemptSubjectsCount": diagnosis.exempt_subjects.len(),
        })),
    );

    diagnosis
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pairs: &[(&str, &str)]) -> AssessmentRequest {
        AssessmentRequest {
            answers: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            session_id: None,
        }
    }

    #[test]
    fn test_full_marks() {
        let result = assess(&answers(&[
            ("1", "yes"),
            ("2", "yes"),
            ("3", "5년 이상"),
            ("4", "전문과정 이수"),
            ("5", "no"),
        ]))
        .unwrap();
        assert_eq!(result.score, 100);
        assert!(result.eligible);
        assert_eq!(result.message, "응시 가능합니다!");
    }

    #[test]
    fn test_conditional() {
        // 20 + 20 + 10 + 10 + 0
        let result = assess(&answers(&[
            ("1", "yes"),
            ("2", "yes"),
            ("3", "1년 미만"),
            ("4", "기초과정 이수"),
            ("5", "yes"),
        ]))
        .unwrap();
        assert_eq!(result.score, 60);
        assert!(result.eligible);
        assert_eq!(result.message, "조건부 응시 가능합니다.");
    }

    #[test]
    fn test_not_eligible() {
        let result = assess(&answers(&[
            ("1", "no"),
            ("2", "yes"),
            ("3", "없음"),
            ("4", "없음"),
            ("5", "no"),
        ]))
        .unwrap();
        assert_eq!(result.score, 35);
        assert!(!result.eligible);
        assert_eq!(result.message, "현재 응시 자격이 없습니다.");
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        // 20 + 20 + 25 + 0 + 15
        let result = assess(&answers(&[
            ("1", "yes"),
            ("2", "yes"),
            ("3", "5년 이상"),
            ("4", "없음"),
            ("5", "no"),
        ]))
        .unwrap();
        assert_eq!(result.score, 80);
        assert_eq!(result.message, "응시 가능합니다!");
    }

    #[test]
    fn test_missing_answer() {
        let result = assess(&answers(&[("1", "yes"), ("2", "yes")]));
        assert!(matches!(
            result,
            Err(AppError::MissingField { ref field }) if field == "answers.3"
        ));
    }

    #[test]
    fn test_invalid_option() {
        let result = assess(&answers(&[
            ("1", "yes"),
            ("2", "yes"),
            ("3", "10년"),
            ("4", "없음"),
            ("5", "no"),
        ]));
        assert!(matches!(result, Err(AppError::InvalidFormat { .. })));

        let result = assess(&answers(&[
            ("1", "maybe"),
            ("2", "yes"),
            ("3", "없음"),
            ("4", "없음"),
            ("5", "no"),
        ]));
        assert!(matches!(result, Err(AppError::InvalidFormat { .. })));
    }

    #[test]
    fn test_questionnaire_shape() {
        assert_eq!(QUESTIONS.len(), 5);
        let json = serde_json::to_value(QUESTIONS).unwrap();
        assert_eq!(json[0]["type"], "yesno");
        assert!(json[0].get("options").is_none());
        assert_eq!(json[2]["options"][4], "5년 이상");
    }

    #[test]
    fn test_diagnosis_lists_categories() {
        let diagnosis = diagnose(&DiagnosisRequest::default());
        assert_eq!(diagnosis.eligible_categories.len(), 18);
        assert_eq!(diagnosis.exempt_subjects.len(), 10);
        assert_eq!(diagnosis.notes[0], "학력 정보가 입력되지 않았습니다.");
        assert!(diagnosis.notes.iter().any(|n| n.contains("18개 종목")));
    }

    #[test]
    fn test_diagnosis_notes_follow_input() {
        let request = DiagnosisRequest {
            education: vec![
                EducationEntry { education: "고등학교 졸업".into() },
                EducationEntry { education: "대학 졸업".into() },
                EducationEntry { education: "  ".into() },
            ],
            qualifications: vec![QualificationEntry {
                qualification_info: "정보통신산업기사".into(),
                acquisition_date: "2020-05-01".into(),
            }],
            work_experience: vec![WorkExperienceEntry {
                job_field: "통신설비 유지보수".into(),
                experience_period: "2년 6개월".into(),
            }],
            skill_competitions: vec![
                CompetitionEntry {
                    competition: "전국기능경기대회 은메달".into(),
                    award_date: "2019-10-01".into(),
                },
                CompetitionEntry::default(),
            ],
            session_id: Some("session-1".into()),
        };

        let notes = diagnose(&request).notes;
        assert_eq!(notes[0], "학력 요건 충족: 대학 졸업");
        assert!(notes.contains(&"보유 자격 확인: 정보통신산업기사 (2020-05-01 취득)".to_string()));
        assert!(notes.contains(&"경력 인정 기간: 2년 6개월 (통신설비 유지보수)".to_string()));
        assert!(notes.contains(&"기능경기대회 입상 이력 1건 확인".to_string()));
    }
}
