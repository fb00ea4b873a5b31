use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{
    ChatMessage, Flashcard, MaterialId, QuizProgress, StudyMaterial, StudyPlanDay, Tier, UserStats,
    WeakSpotInsight,
};

/// The aggregate root for one authenticated session.
///
/// Rehydrated from the remote store on login and torn down to
/// `AppState::initial` on logout. Mutated only via whole-state transform
/// steps under the single-threaded cooperative model, so no locking
/// discipline is needed.
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    /// Local mirror of stored materials, newest first.
    pub materials: Vec<StudyMaterial>,
    /// Which materials currently provide context to AI operations.
    /// Always a subset of `materials` ids; insertion order is irrelevant.
    pub selected_material_ids: Vec<MaterialId>,
    pub plan: Vec<StudyPlanDay>,
    pub flashcards: Vec<Flashcard>,
    pub stats: UserStats,
    pub tier: Tier,
    pub exam_date: NaiveDate,
    pub daily_time_minutes: u32,
    /// Missed-topic frequency counts across quiz sessions.
    pub weak_spots: BTreeMap<String, u32>,
    pub weak_spot_insights: BTreeMap<String, WeakSpotInsight>,
    pub current_quiz: Option<QuizProgress>,
    pub dark_mode: bool,
    pub chat_history: Vec<ChatMessage>,
}

impl AppState {
    /// Fresh defaults for a new session: exam assumed two weeks out,
    /// 45 minutes of study per day.
    #[must_use]
    pub fn initial(now: DateTime<Utc>) -> Self {
        let exam_date = now
            .date_naive()
            .checked_add_days(Days::new(14))
            .unwrap_or_else(|| now.date_naive());
        Self {
            materials: Vec::new(),
            selected_material_ids: Vec::new(),
            plan: Vec::new(),
            flashcards: Vec::new(),
            stats: UserStats::default(),
            tier: Tier::Free,
            exam_date,
            daily_time_minutes: 45,
            weak_spots: BTreeMap::new(),
            weak_spot_insights: BTreeMap::new(),
            current_quiz: None,
            dark_mode: false,
            chat_history: Vec::new(),
        }
    }

    /// True when the stored material count has reached the tier limit.
    #[must_use]
    pub fn at_material_limit(&self) -> bool {
        self.materials.len() >= self.tier.entitlements().material_limit
    }

    /// Prepend a material to the mirror and select it for AI context.
    pub fn add_material(&mut self, material: StudyMaterial) {
        let id = material.id();
        self.materials.insert(0, material);
        if !self.selected_material_ids.contains(&id) {
            self.selected_material_ids.push(id);
        }
    }

    /// Drop a material from the mirror and from the selection set.
    pub fn remove_material(&mut self, id: MaterialId) {
        self.materials.retain(|m| m.id() != id);
        self.selected_material_ids.retain(|sid| *sid != id);
    }

    /// Toggle a material in or out of the AI context selection.
    ///
    /// Ids that do not name an existing material are ignored so the
    /// selection stays a subset of the mirror.
    pub fn toggle_selection(&mut self, id: MaterialId) {
        if self.selected_material_ids.contains(&id) {
            self.selected_material_ids.retain(|sid| *sid != id);
        } else if self.materials.iter().any(|m| m.id() == id) {
            self.selected_material_ids.push(id);
        }
    }

    #[must_use]
    pub fn is_selected(&self, id: MaterialId) -> bool {
        self.selected_material_ids.contains(&id)
    }

    /// The currently selected materials, in mirror order.
    #[must_use]
    pub fn selected_materials(&self) -> Vec<&StudyMaterial> {
        self.materials
            .iter()
            .filter(|m| self.selected_material_ids.contains(&m.id()))
            .collect()
    }

    /// Drop selection entries that no longer name an existing material.
    pub fn prune_selection(&mut self) {
        let ids: Vec<MaterialId> = self.materials.iter().map(StudyMaterial::id).collect();
        self.selected_material_ids.retain(|sid| ids.contains(sid));
    }

    /// Bump the miss counter for each topic (duplicates count).
    pub fn record_missed_topics<'a>(&mut self, topics: impl IntoIterator<Item = &'a str>) {
        for topic in topics {
            *self.weak_spots.entry(topic.to_string()).or_insert(0) += 1;
        }
    }

    /// Snapshot the syncable metadata slice (everything but the materials
    /// mirror, which is persisted individually per mutation).
    #[must_use]
    pub fn document(&self) -> StateDocument {
        StateDocument {
            selected_material_ids: self.selected_material_ids.clone(),
            plan: self.plan.clone(),
            flashcards: self.flashcards.clone(),
            stats: self.stats.clone(),
            tier: self.tier,
            exam_date: self.exam_date,
            daily_time_minutes: self.daily_time_minutes,
            weak_spots: self.weak_spots.clone(),
            weak_spot_insights: self.weak_spot_insights.clone(),
            current_quiz: self.current_quiz.clone(),
            dark_mode: self.dark_mode,
            chat_history: self.chat_history.clone(),
        }
    }

    /// Rehydrate the metadata slice from a persisted document, then prune
    /// selection ids that no longer resolve against the materials mirror.
    pub fn apply_document(&mut self, doc: StateDocument) {
        self.selected_material_ids = doc.selected_material_ids;
        self.plan = doc.plan;
        self.flashcards = doc.flashcards;
        self.stats = doc.stats;
        self.tier = doc.tier;
        self.exam_date = doc.exam_date;
        self.daily_time_minutes = doc.daily_time_minutes;
        self.weak_spots = doc.weak_spots;
        self.weak_spot_insights = doc.weak_spot_insights;
        self.current_quiz = doc.current_quiz;
        self.dark_mode = doc.dark_mode;
        self.chat_history = doc.chat_history;
        self.prune_selection();
    }
}

/// The per-user JSON blob persisted by the remote store: the mutable
/// metadata slice of `AppState`, excluding the materials mirror.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub selected_material_ids: Vec<MaterialId>,
    #[serde(default)]
    pub plan: Vec<StudyPlanDay>,
    #[serde(default)]
    pub flashcards: Vec<Flashcard>,
    #[serde(default)]
    pub stats: UserStats,
    #[serde(default)]
    pub tier: Tier,
    pub exam_date: NaiveDate,
    pub daily_time_minutes: u32,
    #[serde(default)]
    pub weak_spots: BTreeMap<String, u32>,
    #[serde(default)]
    pub weak_spot_insights: BTreeMap<String, WeakSpotInsight>,
    #[serde(default)]
    pub current_quiz: Option<QuizProgress>,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MaterialKind;
    use crate::time::fixed_now;

    fn material(name: &str) -> StudyMaterial {
        StudyMaterial::new(
            MaterialId::generate(),
            name,
            MaterialKind::Text,
            "content",
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn initial_state_defaults() {
        let state = AppState::initial(fixed_now());
        assert_eq!(state.tier, Tier::Free);
        assert_eq!(state.daily_time_minutes, 45);
        assert_eq!(
            state.exam_date,
            fixed_now().date_naive().checked_add_days(Days::new(14)).unwrap()
        );
        assert!(state.materials.is_empty());
        assert!(state.current_quiz.is_none());
    }

    #[test]
    fn add_material_prepends_and_selects() {
        let mut state = AppState::initial(fixed_now());
        let first = material("first");
        let second = material("second");
        let second_id = second.id();

        state.add_material(first);
        state.add_material(second);

        assert_eq!(state.materials[0].id(), second_id);
        assert!(state.is_selected(second_id));
    }

    #[test]
    fn selection_stays_subset_under_add_and_remove() {
        let mut state = AppState::initial(fixed_now());
        let a = material("a");
        let b = material("b");
        let a_id = a.id();
        let b_id = b.id();

        state.add_material(a);
        state.add_material(b);
        state.remove_material(a_id);

        assert!(!state.selected_material_ids.contains(&a_id));
        for sid in &state.selected_material_ids {
            assert!(state.materials.iter().any(|m| m.id() == *sid));
        }
        assert!(state.is_selected(b_id));
    }

    #[test]
    fn toggle_ignores_unknown_ids() {
        let mut state = AppState::initial(fixed_now());
        state.toggle_selection(MaterialId::generate());
        assert!(state.selected_material_ids.is_empty());
    }

    #[test]
    fn toggle_flips_membership() {
        let mut state = AppState::initial(fixed_now());
        let m = material("m");
        let id = m.id();
        state.add_material(m);

        state.toggle_selection(id);
        assert!(!state.is_selected(id));
        state.toggle_selection(id);
        assert!(state.is_selected(id));
    }

    #[test]
    fn missed_topics_count_duplicates() {
        let mut state = AppState::initial(fixed_now());
        state.record_missed_topics(["Cells", "Cells", "Mitosis"]);
        assert_eq!(state.weak_spots.get("Cells"), Some(&2));
        assert_eq!(state.weak_spots.get("Mitosis"), Some(&1));
    }

    #[test]
    fn document_roundtrip_prunes_stale_selection() {
        let mut state = AppState::initial(fixed_now());
        let kept = material("kept");
        let dropped = material("dropped");
        let dropped_id = dropped.id();
        state.add_material(kept);
        state.add_material(dropped);
        state.dark_mode = true;

        let doc = state.document();
        let json = serde_json::to_string(&doc).unwrap();
        let restored: StateDocument = serde_json::from_str(&json).unwrap();

        // Material deleted remotely between snapshot and rehydration.
        state.remove_material(dropped_id);
        state.materials.retain(|m| m.id() != dropped_id);
        state.apply_document(restored);

        assert!(state.dark_mode);
        assert!(!state.selected_material_ids.contains(&dropped_id));
        for sid in &state.selected_material_ids {
            assert!(state.materials.iter().any(|m| m.id() == *sid));
        }
    }

    #[test]
    fn document_tolerates_sparse_blobs() {
        // Older clients may have persisted a smaller shape.
        let doc: StateDocument = serde_json::from_str(
            r#"{"exam_date":"2024-06-01","daily_time_minutes":30}"#,
        )
        .unwrap();
        assert_eq!(doc.tier, Tier::Free);
        assert!(doc.plan.is_empty());
        assert_eq!(doc.stats.daily_goal, 20);
    }
}
