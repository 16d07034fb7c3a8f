use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use checkpath_core::{AnswerValue, Configuration};
use checkpath_storage::{
    CheckpathStorage, ExecutionRecord, ExecutionState, MemoryStorage, TemplateVersionRecord,
    UndoSnapshotRecord,
};

use super::*;

/// The appliance-inspection fixture: p1 routes "rota" to the damage branch
/// (p2, p3, p4) and "buena" to the sign-off branch (p6, p9). Two outcomes:
/// "order-part" (p1 == rota AND p3 == no, priority 100) and "escalate"
/// (p1 == rota, priority 50).
fn fixture_config() -> Configuration {
    serde_json::from_value(serde_json::json!({
        "basics": { "name": "Appliance inspection", "maxDepth": 10 },
        "questions": [
            {
                "id": "p1",
                "text": "Screen condition?",
                "kind": "SINGLE_CHOICE",
                "options": [
                    { "value": "rota", "label": "Broken" },
                    { "value": "sumida", "label": "Dented" },
                    { "value": "rayada", "label": "Scratched" },
                    { "value": "buena", "label": "Good" }
                ],
                "validation": { "required": true },
                "isInitial": true
            },
            {
                "id": "p2",
                "text": "Photograph the damage",
                "kind": "PHOTO_URL",
                "validation": { "required": true }
            },
            { "id": "p3", "text": "Is a spare in stock?", "kind": "TEXT" },
            { "id": "p4", "text": "Estimate repair hours", "kind": "NUMBER" },
            { "id": "p6", "text": "Customer signature", "kind": "TEXT" },
            { "id": "p9", "text": "Closing notes", "kind": "TEXT" }
        ],
        "transitions": [
            {
                "id": "t-rota",
                "fromQuestionId": "p1",
                "operator": "EQUALS",
                "comparand": "rota",
                "nextQuestionIds": ["p2", "p3", "p4"],
                "priority": 10
            },
            {
                "id": "t-buena",
                "fromQuestionId": "p1",
                "operator": "EQUALS",
                "comparand": "buena",
                "nextQuestionIds": ["p6", "p9"],
                "priority": 10
            }
        ],
        "outcomes": [
            {
                "id": "escalate",
                "name": "Escalate to supervisor",
                "priority": 50,
                "conditions": [
                    { "questionId": "p1", "operator": "EQUALS", "comparand": "rota" }
                ],
                "actions": [{ "kind": "ESCALATE" }]
            },
            {
                "id": "order-part",
                "name": "Order replacement part",
                "priority": 100,
                "conditions": [
                    { "questionId": "p1", "operator": "EQUALS", "comparand": "rota" },
                    { "questionId": "p3", "operator": "EQUALS", "comparand": "no" }
                ],
                "actions": [{ "kind": "ORDER_PART" }]
            }
        ]
    }))
    .unwrap()
}

async fn setup() -> (Arc<MemoryStorage>, ExecutionCoordinator<MemoryStorage>, String) {
    let storage = Arc::new(MemoryStorage::new());
    let now = OffsetDateTime::now_utc();

    storage
        .insert_version(TemplateVersionRecord {
            id: "v1".to_string(),
            template_id: "t1".to_string(),
            version: 1,
            configuration: fixture_config(),
            checksum: checkpath_core::configuration_checksum(&fixture_config()),
            published_at: now,
        })
        .await
        .unwrap();

    let execution_id = Uuid::new_v4().to_string();
    storage
        .insert_execution(ExecutionRecord {
            id: execution_id.clone(),
            template_id: "t1".to_string(),
            version_id: "v1".to_string(),
            state: ExecutionState::InProgress,
            started_at: now,
            finished_at: None,
        })
        .await
        .unwrap();

    let coordinator = ExecutionCoordinator::new(storage.clone());
    (storage, coordinator, execution_id)
}

fn path_ids(path: &[VisibleQuestion]) -> Vec<&str> {
    path.iter().map(|q| q.question_id.as_str()).collect()
}

#[tokio::test]
async fn initial_path_is_just_the_initial_question() {
    let (_, coordinator, execution_id) = setup().await;
    let path = coordinator.resolve_visible_path(&execution_id).await.unwrap();
    assert_eq!(path_ids(&path), vec!["p1"]);
}

#[tokio::test]
async fn resolve_visible_path_unknown_execution_is_not_found() {
    let (_, coordinator, _) = setup().await;
    let err = coordinator.resolve_visible_path("missing").await.unwrap_err();
    assert!(matches!(err, EngineError::ExecutionNotFound { .. }));
}

#[tokio::test]
async fn answering_rota_opens_the_damage_branch() {
    let (_, coordinator, execution_id) = setup().await;
    let result = coordinator
        .apply_answer(&execution_id, "p1", AnswerValue::text("rota"))
        .await
        .unwrap();
    assert_eq!(path_ids(&result.visible_path), vec!["p1", "p2", "p3", "p4"]);
    assert_eq!(result.next_question_ids, vec!["p2", "p3", "p4"]);
    assert!(result.invalidated_answers.is_empty());
}

#[tokio::test]
async fn switching_branches_invalidates_answers_left_behind() {
    let (storage, coordinator, execution_id) = setup().await;
    coordinator
        .apply_answer(&execution_id, "p1", AnswerValue::text("rota"))
        .await
        .unwrap();
    coordinator
        .apply_answer(&execution_id, "p3", AnswerValue::text("no"))
        .await
        .unwrap();

    let result = coordinator
        .apply_answer(&execution_id, "p1", AnswerValue::text("buena"))
        .await
        .unwrap();

    assert_eq!(path_ids(&result.visible_path), vec!["p1", "p6", "p9"]);
    assert_eq!(
        result.invalidated_answers,
        vec![InvalidatedAnswer {
            question_id: "p3".to_string(),
            text: "Is a spare in stock?".to_string(),
        }]
    );

    // The p1 answer itself (the one just written) survives.
    let rows = storage.list_answers(&execution_id).await.unwrap();
    let valid: Vec<&str> = rows
        .iter()
        .filter(|r| r.is_valid)
        .map(|r| r.question_id.as_str())
        .collect();
    assert_eq!(valid, vec!["p1"]);
}

#[tokio::test]
async fn reanswering_supersedes_without_invalidation_report() {
    let (storage, coordinator, execution_id) = setup().await;
    coordinator
        .apply_answer(&execution_id, "p1", AnswerValue::text("rota"))
        .await
        .unwrap();
    let result = coordinator
        .apply_answer(&execution_id, "p1", AnswerValue::text("rota"))
        .await
        .unwrap();
    assert!(result.invalidated_answers.is_empty());

    let rows = storage.list_answers(&execution_id).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows.iter().filter(|r| r.is_valid).count(), 1);
}

#[tokio::test]
async fn undo_restores_the_exact_pre_apply_answer_set() {
    let (storage, coordinator, execution_id) = setup().await;
    coordinator
        .apply_answer(&execution_id, "p1", AnswerValue::text("rota"))
        .await
        .unwrap();
    coordinator
        .apply_answer(&execution_id, "p3", AnswerValue::text("no"))
        .await
        .unwrap();
    let before = storage.list_answers(&execution_id).await.unwrap();

    coordinator
        .apply_answer(&execution_id, "p1", AnswerValue::text("buena"))
        .await
        .unwrap();

    assert!(coordinator.undo_last(&execution_id).await.unwrap());
    let after = storage.list_answers(&execution_id).await.unwrap();
    assert_eq!(after, before);

    let path = coordinator.resolve_visible_path(&execution_id).await.unwrap();
    assert_eq!(path_ids(&path), vec!["p1", "p2", "p3", "p4"]);
}

#[tokio::test]
async fn undo_consumes_the_snapshot() {
    let (_, coordinator, execution_id) = setup().await;
    coordinator
        .apply_answer(&execution_id, "p1", AnswerValue::text("rota"))
        .await
        .unwrap();

    assert!(coordinator.undo_last(&execution_id).await.unwrap());
    // Only one snapshot existed; it was consumed.
    assert!(!coordinator.undo_last(&execution_id).await.unwrap());
}

#[tokio::test]
async fn expired_snapshot_means_nothing_to_undo() {
    let (storage, coordinator, execution_id) = setup().await;
    let past = OffsetDateTime::now_utc() - Duration::seconds(60);
    storage
        .insert_snapshot(UndoSnapshotRecord {
            id: "stale".to_string(),
            execution_id: execution_id.clone(),
            created_at: past,
            expires_at: past + SNAPSHOT_TTL,
            answers: Vec::new(),
        })
        .await
        .unwrap();

    assert!(!coordinator.undo_last(&execution_id).await.unwrap());
}

#[tokio::test]
async fn undo_on_unknown_execution_is_not_found() {
    let (_, coordinator, _) = setup().await;
    let err = coordinator.undo_last("missing").await.unwrap_err();
    assert!(matches!(err, EngineError::ExecutionNotFound { .. }));
}

#[tokio::test]
async fn finalize_lists_every_missing_required_question_and_keeps_state() {
    let (storage, coordinator, execution_id) = setup().await;
    coordinator
        .apply_answer(&execution_id, "p1", AnswerValue::text("rota"))
        .await
        .unwrap();

    // p2 is required and unanswered on the rota branch.
    let err = coordinator.finalize(&execution_id).await.unwrap_err();
    match err {
        EngineError::ValidationFailed { missing } => {
            assert_eq!(missing.len(), 1);
            assert!(missing[0].contains("Photograph the damage"));
        }
        other => panic!("expected ValidationFailed, got {other}"),
    }

    let execution = storage.get_execution(&execution_id).await.unwrap();
    assert_eq!(execution.state, ExecutionState::InProgress);
}

#[tokio::test]
async fn finalize_returns_outcomes_priority_descending_and_finishes() {
    let (storage, coordinator, execution_id) = setup().await;
    coordinator
        .apply_answer(&execution_id, "p1", AnswerValue::text("rota"))
        .await
        .unwrap();
    coordinator
        .apply_answer(&execution_id, "p2", AnswerValue::text("https://img/1.jpg"))
        .await
        .unwrap();
    coordinator
        .apply_answer(&execution_id, "p3", AnswerValue::text("no"))
        .await
        .unwrap();

    let result = coordinator.finalize(&execution_id).await.unwrap();
    let ids: Vec<&str> = result.outcomes.iter().map(|o| o.id.as_str()).collect();
    // Both outcomes fire: order-part (100) before escalate (50).
    assert_eq!(ids, vec!["order-part", "escalate"]);

    let execution = storage.get_execution(&execution_id).await.unwrap();
    assert_eq!(execution.state, ExecutionState::Finished);
    assert_eq!(execution.finished_at, Some(result.finished_at));
}

#[tokio::test]
async fn finished_execution_rejects_further_mutations() {
    let (_, coordinator, execution_id) = setup().await;
    coordinator
        .apply_answer(&execution_id, "p1", AnswerValue::text("buena"))
        .await
        .unwrap();
    coordinator.finalize(&execution_id).await.unwrap();

    let err = coordinator
        .apply_answer(&execution_id, "p6", AnswerValue::text("signed"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));

    let err = coordinator.finalize(&execution_id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState { .. }));
}

#[tokio::test]
async fn lock_registry_sheds_entries_for_released_and_bogus_ids() {
    let (_, coordinator, execution_id) = setup().await;

    // Mutations against ids that never existed still take a lock briefly.
    for ghost in ["ghost-1", "ghost-2"] {
        let err = coordinator
            .apply_answer(ghost, "p1", AnswerValue::text("rota"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ExecutionNotFound { .. }));
    }

    coordinator
        .apply_answer(&execution_id, "p1", AnswerValue::text("rota"))
        .await
        .unwrap();

    // Each acquisition sweeps entries whose lock has been released, so the
    // ghost ids are gone and only the most recent acquisition remains.
    let map = coordinator.locks.map.lock().await;
    assert_eq!(map.len(), 1);
    assert!(map.contains_key(&execution_id));
}
