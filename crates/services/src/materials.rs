//! Material intake: validation, tier limits, uploads, distillation, and
//! persistence of the per-user material rows.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use studyunit_core::Clock;
use studyunit_core::model::{AppState, MaterialId, MaterialKind, StudyMaterial, UserId};
use studyunit_storage::{MaterialRecord, MaterialRepository, ObjectStore};

use crate::distillation::Distiller;
use crate::error::MaterialServiceError;

/// How long signed display URLs stay valid, in seconds.
pub const SIGNED_URL_TTL_SECS: u32 = 3600;

/// Result of an add attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(MaterialId),
    /// The tier's stored-material cap is already reached; nothing changed.
    LimitReached,
}

pub struct MaterialService {
    clock: Clock,
    materials: Arc<dyn MaterialRepository>,
    objects: Arc<dyn ObjectStore>,
    distiller: Arc<dyn Distiller>,
}

impl MaterialService {
    #[must_use]
    pub fn new(
        clock: Clock,
        materials: Arc<dyn MaterialRepository>,
        objects: Arc<dyn ObjectStore>,
        distiller: Arc<dyn Distiller>,
    ) -> Self {
        Self {
            clock,
            materials,
            objects,
            distiller,
        }
    }

    /// Add a typed note. Distills, persists, and selects it for AI context.
    ///
    /// # Errors
    ///
    /// Returns `MaterialServiceError` when the text is blank or the row
    /// cannot be persisted.
    pub async fn add_text_note(
        &self,
        state: &mut AppState,
        user: &UserId,
        name: Option<&str>,
        text: &str,
    ) -> Result<AddOutcome, MaterialServiceError> {
        if state.at_material_limit() {
            return Ok(AddOutcome::LimitReached);
        }

        let now = self.clock.now();
        let name = match name {
            Some(given) if !given.trim().is_empty() => given.to_owned(),
            _ => format!("Typed Note {}", now.date_naive()),
        };
        let mut material =
            StudyMaterial::new(MaterialId::generate(), name, MaterialKind::Text, text, now)?;
        self.distill(&mut material).await;
        self.persist(state, user, material, None).await
    }

    /// Add an uploaded file. Image bytes become a data URL for distillation;
    /// anything else is treated as text.
    ///
    /// # Errors
    ///
    /// Returns `MaterialServiceError` when the file is empty or the upload
    /// or row insert fails.
    pub async fn add_upload(
        &self,
        state: &mut AppState,
        user: &UserId,
        file_name: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<AddOutcome, MaterialServiceError> {
        if state.at_material_limit() {
            return Ok(AddOutcome::LimitReached);
        }

        let now = self.clock.now();
        let id = MaterialId::generate();
        let path = object_path(user, id, file_name);
        let is_image = content_type.starts_with("image/");
        let content = if is_image {
            format!("data:{content_type};base64,{}", BASE64.encode(&bytes))
        } else {
            String::from_utf8_lossy(&bytes).into_owned()
        };
        let kind = if is_image {
            MaterialKind::Image
        } else {
            MaterialKind::Text
        };

        let mut material =
            StudyMaterial::new(id, file_name, kind, content, now)?.with_storage_path(path.clone());
        self.objects.upload(&path, bytes, content_type).await?;
        self.distill(&mut material).await;

        let signed_url = if is_image {
            self.first_signed_url(&path).await
        } else {
            None
        };
        self.persist(state, user, material, signed_url).await
    }

    /// Add a dictated note. The transcript is refined into clean notes and
    /// kept alongside them for reference.
    ///
    /// # Errors
    ///
    /// Returns `MaterialServiceError` when the transcript is blank, the
    /// refinement request fails in transit, or the row insert fails.
    pub async fn add_voice_note(
        &self,
        state: &mut AppState,
        user: &UserId,
        transcript: &str,
    ) -> Result<AddOutcome, MaterialServiceError> {
        if state.at_material_limit() {
            return Ok(AddOutcome::LimitReached);
        }

        let refined = self.distiller.refine_voice_note(transcript).await?;

        let now = self.clock.now();
        let name = format!("Voice Note {}", now.format("%Y-%m-%d %H:%M"));
        let content = if refined.refined_content.trim().is_empty() {
            transcript.to_owned()
        } else {
            refined.refined_content
        };
        let mut material =
            StudyMaterial::new(MaterialId::generate(), name, MaterialKind::Voice, content, now)?
                .with_transcript(transcript);
        if !refined.summary.is_empty() || !refined.topics.is_empty() {
            material.apply_distillation(refined.summary, refined.topics);
        }
        self.persist(state, user, material, None).await
    }

    /// Remove a material everywhere. Remote deletes are best effort; the
    /// local mirror always drops the material so the user sees it gone
    /// immediately.
    pub async fn remove(&self, state: &mut AppState, user: &UserId, id: MaterialId) {
        if let Some(material) = state.materials.iter().find(|m| m.id() == id) {
            if let Some(path) = material.storage_path() {
                if let Err(err) = self.objects.remove(&[path.to_owned()]).await {
                    tracing::warn!(%err, path, "stored object removal failed");
                }
            }
        }
        if let Err(err) = self.materials.delete_material(user, id).await {
            tracing::warn!(%err, %id, "material row delete failed; dropping locally anyway");
        }
        state.remove_material(id);
    }

    /// Distillation is additive: a gateway failure leaves the material
    /// unprocessed rather than blocking the add.
    async fn distill(&self, material: &mut StudyMaterial) {
        match self.distiller.process_material(material).await {
            Ok(result) => material.apply_distillation(result.summary, result.topics),
            Err(err) => {
                tracing::warn!(%err, name = material.name(), "distillation failed; storing unprocessed");
            }
        }
    }

    async fn persist(
        &self,
        state: &mut AppState,
        user: &UserId,
        material: StudyMaterial,
        signed_url: Option<String>,
    ) -> Result<AddOutcome, MaterialServiceError> {
        let mut record = MaterialRecord::from_material(&material);
        // The backend may assign its own row id; adopt it.
        record.id = self.materials.insert_material(user, &record).await?;
        let id = record.id;

        let mut material = record.into_material();
        material.set_signed_url(signed_url);
        state.add_material(material);
        Ok(AddOutcome::Added(id))
    }

    async fn first_signed_url(&self, path: &str) -> Option<String> {
        match self
            .objects
            .signed_urls(&[path.to_owned()], SIGNED_URL_TTL_SECS)
            .await
        {
            Ok(urls) => urls.into_iter().next().map(|signed| signed.url),
            Err(err) => {
                tracing::warn!(%err, path, "signing the uploaded object failed");
                None
            }
        }
    }
}

/// Re-derive display URLs for image materials backed by stored objects.
/// Failures degrade to missing previews, never to errors.
pub async fn refresh_signed_urls(objects: &dyn ObjectStore, materials: &mut [StudyMaterial]) {
    let paths: Vec<String> = materials
        .iter()
        .filter(|m| m.kind() == MaterialKind::Image)
        .filter_map(|m| m.storage_path().map(ToOwned::to_owned))
        .collect();
    if paths.is_empty() {
        return;
    }

    match objects.signed_urls(&paths, SIGNED_URL_TTL_SECS).await {
        Ok(urls) => {
            for material in materials.iter_mut() {
                if material.kind() != MaterialKind::Image {
                    continue;
                }
                let url = material
                    .storage_path()
                    .and_then(|path| urls.iter().find(|signed| signed.path == path))
                    .map(|signed| signed.url.clone());
                material.set_signed_url(url);
            }
        }
        Err(err) => tracing::warn!(%err, "signed URL refresh failed"),
    }
}

fn object_path(user: &UserId, id: MaterialId, file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}/materials/{id}/{safe}", user.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use studyunit_core::model::{
        Flashcard, PracticeQuestion, QuizDifficulty, StudyPlanDay, WeakSpotInsight,
    };
    use studyunit_core::time::fixed_clock;
    use studyunit_storage::{InMemoryBackend, Storage};

    use crate::distillation::{ChatContext, Distillation, VoiceDistillation};
    use crate::error::DistillationError;

    struct StubDistiller;

    #[async_trait]
    impl Distiller for StubDistiller {
        async fn process_material(
            &self,
            _material: &StudyMaterial,
        ) -> Result<Distillation, DistillationError> {
            Ok(Distillation {
                summary: "stub summary".into(),
                topics: vec!["Stub Topic".into()],
            })
        }

        async fn refine_voice_note(
            &self,
            _transcript: &str,
        ) -> Result<VoiceDistillation, DistillationError> {
            Ok(VoiceDistillation {
                refined_content: "clean notes".into(),
                summary: "voice summary".into(),
                topics: vec!["Dictation".into()],
            })
        }

        async fn generate_quiz(
            &self,
            _materials: &[&StudyMaterial],
            _count: u32,
            _difficulty: QuizDifficulty,
        ) -> Result<Vec<PracticeQuestion>, DistillationError> {
            Ok(Vec::new())
        }

        async fn generate_flashcards(
            &self,
            _materials: &[&StudyMaterial],
        ) -> Result<Vec<Flashcard>, DistillationError> {
            Ok(Vec::new())
        }

        async fn generate_study_plan(
            &self,
            _materials: &[&StudyMaterial],
            _exam_date: NaiveDate,
            _daily_minutes: u32,
        ) -> Result<Vec<StudyPlanDay>, DistillationError> {
            Ok(Vec::new())
        }

        async fn weak_spot_insights(
            &self,
            _topics: &[String],
            _materials: &[&StudyMaterial],
        ) -> Result<Vec<WeakSpotInsight>, DistillationError> {
            Ok(Vec::new())
        }

        async fn tutor_reply(
            &self,
            _context: ChatContext<'_>,
            _message: &str,
        ) -> Result<String, DistillationError> {
            Ok("stub reply".into())
        }
    }

    fn service(backend: &InMemoryBackend) -> MaterialService {
        let storage = Storage::from_in_memory(backend.clone());
        MaterialService::new(
            fixed_clock(),
            storage.materials,
            storage.objects,
            Arc::new(StubDistiller),
        )
    }

    #[tokio::test]
    async fn text_note_is_distilled_persisted_and_selected() {
        let backend = InMemoryBackend::new();
        let svc = service(&backend);
        let mut state = AppState::initial(fixed_clock().now());
        let user = UserId::new("u1");

        let outcome = svc
            .add_text_note(&mut state, &user, Some("Biology"), "mitochondria notes")
            .await
            .unwrap();
        assert!(matches!(outcome, AddOutcome::Added(_)));

        let material = &state.materials[0];
        assert!(material.processed());
        assert_eq!(material.summary(), Some("stub summary"));
        assert!(state.is_selected(material.id()));
        assert_eq!(
            backend.list_materials(&user).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn limit_blocks_the_add_without_side_effects() {
        let backend = InMemoryBackend::new();
        let svc = service(&backend);
        let mut state = AppState::initial(fixed_clock().now());
        let user = UserId::new("u1");

        for i in 0..3 {
            svc.add_text_note(&mut state, &user, Some(&format!("n{i}")), "text")
                .await
                .unwrap();
        }
        let outcome = svc
            .add_text_note(&mut state, &user, Some("overflow"), "text")
            .await
            .unwrap();

        assert_eq!(outcome, AddOutcome::LimitReached);
        assert_eq!(state.materials.len(), 3);
        assert_eq!(backend.list_materials(&user).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn image_upload_stores_object_and_signs_a_url() {
        let backend = InMemoryBackend::new();
        let svc = service(&backend);
        let mut state = AppState::initial(fixed_clock().now());
        let user = UserId::new("u1");

        svc.add_upload(&mut state, &user, "scan 1.jpg", vec![1, 2, 3], "image/jpeg")
            .await
            .unwrap();

        assert_eq!(backend.object_count(), 1);
        let material = &state.materials[0];
        assert_eq!(material.kind(), MaterialKind::Image);
        assert!(material.content().starts_with("data:image/jpeg;base64,"));
        assert!(material.signed_url().is_some());
        assert!(material.storage_path().unwrap().ends_with("scan_1.jpg"));
    }

    #[tokio::test]
    async fn voice_note_keeps_the_original_transcript() {
        let backend = InMemoryBackend::new();
        let svc = service(&backend);
        let mut state = AppState::initial(fixed_clock().now());
        let user = UserId::new("u1");

        svc.add_voice_note(&mut state, &user, "um so basically mitosis")
            .await
            .unwrap();

        let material = &state.materials[0];
        assert_eq!(material.kind(), MaterialKind::Voice);
        assert_eq!(material.content(), "clean notes");
        assert_eq!(material.original_transcript(), Some("um so basically mitosis"));
        assert!(material.processed());
    }

    #[tokio::test]
    async fn remove_drops_locally_even_when_the_row_is_gone_remotely() {
        let backend = InMemoryBackend::new();
        let svc = service(&backend);
        let mut state = AppState::initial(fixed_clock().now());
        let user = UserId::new("u1");

        // Present locally but never persisted, so the remote delete fails.
        let orphan = StudyMaterial::new(
            MaterialId::generate(),
            "orphan",
            MaterialKind::Text,
            "text",
            fixed_clock().now(),
        )
        .unwrap();
        let id = orphan.id();
        state.add_material(orphan);

        svc.remove(&mut state, &user, id).await;
        assert!(state.materials.is_empty());
        assert!(state.selected_material_ids.is_empty());
    }
}
