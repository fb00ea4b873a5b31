//! AI distillation gateway.
//!
//! Every generative feature funnels through the [`Distiller`] trait so the
//! rest of the app never touches the wire format. The production
//! implementation speaks an OpenAI-compatible chat completions API and asks
//! for structured JSON payloads; a payload that does not decode degrades to
//! an empty default rather than failing the operation, so only transport
//! problems surface as errors.

use std::env;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use studyunit_core::Clock;
use studyunit_core::model::{
    ChatMessage, ChatRole, Flashcard, MaterialKind, PracticeQuestion, QuizDifficulty,
    StudyMaterial, StudyPlanDay, Tier, WeakSpotInsight,
};

use crate::error::DistillationError;

/// Summary and priority topics extracted from one material.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Distillation {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Cleaned-up dictation plus the usual distillation fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct VoiceDistillation {
    #[serde(default)]
    pub refined_content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Everything the tutor prompt needs besides the new message.
pub struct ChatContext<'a> {
    /// Transcript up to, but not including, the message being sent.
    pub history: &'a [ChatMessage],
    pub materials: &'a [&'a StudyMaterial],
    pub tier: Tier,
    pub difficulty: QuizDifficulty,
    pub user_name: &'a str,
}

/// Generative operations backing distillation, quizzes, plans, flashcards,
/// weak-spot insights, and the tutor chat.
#[async_trait]
pub trait Distiller: Send + Sync {
    /// Summarize a material and pick its highest-priority topics.
    ///
    /// # Errors
    ///
    /// Returns `DistillationError` when the gateway is disabled or the
    /// request fails in transit.
    async fn process_material(
        &self,
        material: &StudyMaterial,
    ) -> Result<Distillation, DistillationError>;

    /// Turn a raw dictation transcript into organized notes.
    ///
    /// # Errors
    ///
    /// Returns `DistillationError` when the gateway is disabled or the
    /// request fails in transit.
    async fn refine_voice_note(
        &self,
        transcript: &str,
    ) -> Result<VoiceDistillation, DistillationError>;

    /// Generate `count` multiple-choice questions from the materials.
    ///
    /// # Errors
    ///
    /// Returns `DistillationError` when the gateway is disabled or the
    /// request fails in transit.
    async fn generate_quiz(
        &self,
        materials: &[&StudyMaterial],
        count: u32,
        difficulty: QuizDifficulty,
    ) -> Result<Vec<PracticeQuestion>, DistillationError>;

    /// Generate front/back study cards from the materials.
    ///
    /// # Errors
    ///
    /// Returns `DistillationError` when the gateway is disabled or the
    /// request fails in transit.
    async fn generate_flashcards(
        &self,
        materials: &[&StudyMaterial],
    ) -> Result<Vec<Flashcard>, DistillationError>;

    /// Generate a day-by-day roadmap toward the exam date.
    ///
    /// # Errors
    ///
    /// Returns `DistillationError` when the gateway is disabled or the
    /// request fails in transit.
    async fn generate_study_plan(
        &self,
        materials: &[&StudyMaterial],
        exam_date: NaiveDate,
        daily_minutes: u32,
    ) -> Result<Vec<StudyPlanDay>, DistillationError>;

    /// Remediation advice for repeatedly missed topics.
    ///
    /// # Errors
    ///
    /// Returns `DistillationError` when the gateway is disabled or the
    /// request fails in transit.
    async fn weak_spot_insights(
        &self,
        topics: &[String],
        materials: &[&StudyMaterial],
    ) -> Result<Vec<WeakSpotInsight>, DistillationError>;

    /// One tutoring reply, grounded in the selected materials.
    ///
    /// # Errors
    ///
    /// Returns `DistillationError` when the gateway is disabled or the
    /// request fails in transit.
    async fn tutor_reply(
        &self,
        context: ChatContext<'_>,
        message: &str,
    ) -> Result<String, DistillationError>;
}

#[derive(Clone, Debug)]
pub struct DistillerConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl DistillerConfig {
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("STUDYUNIT_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let base_url = env::var("STUDYUNIT_AI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".into());
        let model = env::var("STUDYUNIT_AI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

/// OpenAI-compatible implementation of [`Distiller`].
#[derive(Clone)]
pub struct DistillationService {
    client: Client,
    config: Option<DistillerConfig>,
    clock: Clock,
}

impl DistillationService {
    #[must_use]
    pub fn from_env(clock: Clock) -> Self {
        Self::new(clock, DistillerConfig::from_env())
    }

    #[must_use]
    pub fn new(clock: Clock, config: Option<DistillerConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
            clock,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    async fn complete(
        &self,
        messages: Vec<WireMessage>,
        json_object: bool,
    ) -> Result<Option<String>, DistillationError> {
        let config = self.config.as_ref().ok_or(DistillationError::Disabled)?;

        let url = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        let payload = ChatRequest {
            model: config.model.clone(),
            messages,
            temperature: 0.2,
            response_format: json_object.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DistillationError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }

    async fn complete_json<T: DeserializeOwned + Default>(
        &self,
        prompt_name: &'static str,
        messages: Vec<WireMessage>,
    ) -> Result<T, DistillationError> {
        let raw = self.complete(messages, true).await?;
        Ok(decode_or_default(raw, prompt_name))
    }
}

#[async_trait]
impl Distiller for DistillationService {
    async fn process_material(
        &self,
        material: &StudyMaterial,
    ) -> Result<Distillation, DistillationError> {
        let instruction = "Extract the key ideas from this study material. Respond with a JSON \
             object: {\"summary\": a 2-3 sentence summary, \"topics\": the 3 to 5 \
             highest-priority topic names as an array of strings}.";

        let content = match material.kind() {
            // Image content is stored as a data URL and sent inline.
            MaterialKind::Image => WireContent::Parts(vec![
                WirePart::Image {
                    image_url: ImageUrl {
                        url: material.content().to_owned(),
                    },
                },
                WirePart::Text {
                    text: instruction.to_owned(),
                },
            ]),
            MaterialKind::Text | MaterialKind::Voice => WireContent::Text(format!(
                "{instruction}\n\nMaterial \"{}\":\n{}",
                material.name(),
                material.content()
            )),
        };

        self.complete_json("material distillation", vec![WireMessage::user(content)])
            .await
    }

    async fn refine_voice_note(
        &self,
        transcript: &str,
    ) -> Result<VoiceDistillation, DistillationError> {
        let prompt = format!(
            "Below is a raw voice dictation from a student. Remove filler words, fix obvious \
             transcription mistakes, and organize it into clean study notes. Respond with a JSON \
             object: {{\"refined_content\": the cleaned notes, \"summary\": a 2-3 sentence \
             summary, \"topics\": the 3 to 5 highest-priority topic names}}.\n\n\
             Transcript:\n{transcript}"
        );
        self.complete_json(
            "voice refinement",
            vec![WireMessage::user(WireContent::Text(prompt))],
        )
        .await
    }

    async fn generate_quiz(
        &self,
        materials: &[&StudyMaterial],
        count: u32,
        difficulty: QuizDifficulty,
    ) -> Result<Vec<PracticeQuestion>, DistillationError> {
        let pitch = match difficulty {
            QuizDifficulty::Standard => "Pitch the questions at a standard comprehension level.",
            QuizDifficulty::Challenger => {
                "Make the questions challenging, with plausible distractors."
            }
            QuizDifficulty::Expert => {
                "Make the questions expert level, requiring synthesis across topics."
            }
        };
        let prompt = format!(
            "Generate exactly {count} multiple-choice questions from the study material below. \
             {pitch} Respond with a JSON object: {{\"questions\": [{{\"question\": string, \
             \"options\": exactly 4 strings, \"answer\": one of the options verbatim, \
             \"explanation\": why the answer is right, \"topic\": the topic the question \
             covers}}]}}.\n\n{}",
            material_context(materials)
        );

        let payload: QuestionPayload = self
            .complete_json(
                "quiz generation",
                vec![WireMessage::user(WireContent::Text(prompt))],
            )
            .await?;
        Ok(payload.questions)
    }

    async fn generate_flashcards(
        &self,
        materials: &[&StudyMaterial],
    ) -> Result<Vec<Flashcard>, DistillationError> {
        let prompt = format!(
            "Create concise flashcards covering the most testable facts in the study material \
             below. Respond with a JSON object: {{\"cards\": [{{\"front\": the prompt side, \
             \"back\": the answer side}}]}}.\n\n{}",
            material_context(materials)
        );

        let payload: FlashcardPayload = self
            .complete_json(
                "flashcard generation",
                vec![WireMessage::user(WireContent::Text(prompt))],
            )
            .await?;
        Ok(payload.cards)
    }

    async fn generate_study_plan(
        &self,
        materials: &[&StudyMaterial],
        exam_date: NaiveDate,
        daily_minutes: u32,
    ) -> Result<Vec<StudyPlanDay>, DistillationError> {
        let today = self.clock.today();
        let days_left = (exam_date - today).num_days().max(1);
        let horizon = days_left.min(7);
        let prompt = format!(
            "A student has an exam on {exam_date} ({days_left} days from today, {today}) and can \
             study {daily_minutes} minutes per day. Build a study plan for the next {horizon} \
             days from the material below, front-loading the highest-priority topics. Respond \
             with a JSON object: {{\"days\": [{{\"date\": \"YYYY-MM-DD\", \"tasks\": an array of \
             short task descriptions, \"duration_minutes\": total minutes for the day}}]}}.\n\n{}",
            material_context(materials)
        );

        let payload: PlanPayload = self
            .complete_json(
                "study plan",
                vec![WireMessage::user(WireContent::Text(prompt))],
            )
            .await?;
        Ok(payload
            .days
            .into_iter()
            .enumerate()
            .map(|(offset, day)| {
                let date = day.date.unwrap_or_else(|| {
                    today
                        .checked_add_days(Days::new(offset as u64))
                        .unwrap_or(today)
                });
                StudyPlanDay::from_generated(date, day.tasks, day.duration_minutes)
            })
            .collect())
    }

    async fn weak_spot_insights(
        &self,
        topics: &[String],
        materials: &[&StudyMaterial],
    ) -> Result<Vec<WeakSpotInsight>, DistillationError> {
        let prompt = format!(
            "A student keeps missing quiz questions on these topics: {}. Using their study \
             material below, explain each topic's core idea and suggest one concrete study \
             method for it. Respond with a JSON object: {{\"insights\": [{{\"topic\": the topic \
             name as given, \"explanation\": the core idea in plain language, \"study_method\": \
             one specific technique}}]}}.\n\n{}",
            topics.join(", "),
            material_context(materials)
        );

        let payload: InsightPayload = self
            .complete_json(
                "weak spot insights",
                vec![WireMessage::user(WireContent::Text(prompt))],
            )
            .await?;
        Ok(payload.insights)
    }

    async fn tutor_reply(
        &self,
        context: ChatContext<'_>,
        message: &str,
    ) -> Result<String, DistillationError> {
        let system = format!(
            "You are a friendly, encouraging study tutor helping {}. The student is on the {} \
             plan and prefers {} difficulty. Ground your answers in the student's materials \
             below when they are relevant, and keep replies short.\n\n{}",
            context.user_name,
            context.tier,
            context.difficulty,
            material_context(context.materials)
        );

        let mut messages = vec![WireMessage {
            role: "system",
            content: WireContent::Text(system),
        }];
        for turn in context.history {
            messages.push(WireMessage {
                role: match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "assistant",
                },
                content: WireContent::Text(turn.text.clone()),
            });
        }
        messages.push(WireMessage::user(WireContent::Text(message.to_owned())));

        let raw = self.complete(messages, false).await?;
        Ok(raw
            .map(|text| text.trim().to_owned())
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| {
                "I'm sorry, I couldn't come up with a reply. Please try again.".to_owned()
            }))
    }
}

/// Flatten materials into prompt context. Image bytes are never resent here;
/// their distilled summary stands in for them.
fn material_context(materials: &[&StudyMaterial]) -> String {
    materials
        .iter()
        .map(|material| {
            let body = match material.kind() {
                MaterialKind::Image => material.summary().unwrap_or("An uploaded image."),
                MaterialKind::Text | MaterialKind::Voice => material.content(),
            };
            format!("Material \"{}\":\n{}", material.name(), body)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn decode_or_default<T: DeserializeOwned + Default>(raw: Option<String>, what: &'static str) -> T {
    let Some(raw) = raw else {
        tracing::warn!(what, "model returned no content; using defaults");
        return T::default();
    };
    match serde_json::from_str(strip_fences(&raw)) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(what, %err, "model returned malformed JSON; using defaults");
            T::default()
        }
    }
}

/// Some models wrap JSON in a markdown fence despite the response format.
fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

//
// ─── WIRE TYPES ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: WireContent,
}

impl WireMessage {
    fn user(content: WireContent) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Parts(Vec<WirePart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum WirePart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    Image { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct QuestionPayload {
    #[serde(default)]
    questions: Vec<PracticeQuestion>,
}

#[derive(Debug, Default, Deserialize)]
struct FlashcardPayload {
    #[serde(default)]
    cards: Vec<Flashcard>,
}

#[derive(Debug, Default, Deserialize)]
struct PlanPayload {
    #[serde(default)]
    days: Vec<GeneratedDay>,
}

#[derive(Debug, Deserialize)]
struct GeneratedDay {
    #[serde(default)]
    date: Option<NaiveDate>,
    #[serde(default)]
    tasks: Vec<String>,
    #[serde(default)]
    duration_minutes: u32,
}

#[derive(Debug, Default, Deserialize)]
struct InsightPayload {
    #[serde(default)]
    insights: Vec<WeakSpotInsight>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use studyunit_core::model::MaterialId;
    use studyunit_core::time::{fixed_clock, fixed_now};

    #[test]
    fn decode_tolerates_fences_and_garbage() {
        let fenced = Some("```json\n{\"summary\": \"s\", \"topics\": [\"a\"]}\n```".to_owned());
        let parsed: Distillation = decode_or_default(fenced, "test");
        assert_eq!(parsed.summary, "s");
        assert_eq!(parsed.topics, vec!["a".to_owned()]);

        let garbage: Distillation = decode_or_default(Some("not json at all".into()), "test");
        assert_eq!(garbage, Distillation::default());

        let missing: QuestionPayload = decode_or_default(None, "test");
        assert!(missing.questions.is_empty());
    }

    #[test]
    fn decode_tolerates_partial_payloads() {
        let parsed: VoiceDistillation =
            decode_or_default(Some("{\"refined_content\": \"notes\"}".into()), "test");
        assert_eq!(parsed.refined_content, "notes");
        assert!(parsed.summary.is_empty());
        assert!(parsed.topics.is_empty());
    }

    #[test]
    fn image_context_uses_summary_not_bytes() {
        let mut image = StudyMaterial::new(
            MaterialId::generate(),
            "Scan",
            MaterialKind::Image,
            "data:image/png;base64,AAAA",
            fixed_now(),
        )
        .unwrap();
        image.apply_distillation("A diagram of the cell cycle.", vec!["Mitosis".into()]);

        let context = material_context(&[&image]);
        assert!(context.contains("A diagram of the cell cycle."));
        assert!(!context.contains("base64"));
    }

    #[tokio::test]
    async fn disabled_gateway_refuses_requests() {
        let service = DistillationService::new(fixed_clock(), None);
        assert!(!service.enabled());

        let material = StudyMaterial::new(
            MaterialId::generate(),
            "Notes",
            MaterialKind::Text,
            "content",
            fixed_now(),
        )
        .unwrap();
        let err = service.process_material(&material).await.unwrap_err();
        assert!(matches!(err, DistillationError::Disabled));
    }
}
