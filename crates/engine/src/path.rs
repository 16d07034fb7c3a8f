//! Visible-path resolution.
//!
//! The visible path is the set of questions reachable from the initial
//! question(s) under the current valid answers, found by breadth-first
//! traversal of the transition graph. Each dequeued id is marked visited
//! BEFORE its successors are computed and visited ids are never re-enqueued,
//! so the walk terminates on any configuration, cycles included. `maxDepth`
//! plays no role here (authoring-time advisory only).
//!
//! Successor resolution per question is first-match-wins: non-default
//! transitions in descending priority order, stopping at the first whose
//! condition holds; the default transition applies only when none matched.
//! This is deliberately asymmetric with outcome evaluation, which collects
//! ALL matching rules.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use checkpath_core::{AnswerValue, Configuration, Question, Transition};

use crate::condition;

/// Successor question ids for one question under the given valid answers.
///
/// Duplicate targets across a transition's `nextQuestionIds` are collapsed,
/// preserving first-seen order.
pub fn next_question_ids(
    config: &Configuration,
    question_id: &str,
    answers: &BTreeMap<String, AnswerValue>,
) -> Vec<String> {
    let mut transitions: Vec<&Transition> = config
        .transitions
        .iter()
        .filter(|t| t.from_question_id == question_id)
        .collect();

    if transitions.is_empty() {
        return Vec::new();
    }

    // Higher priority first; stable, so declaration order breaks ties.
    transitions.sort_by(|a, b| b.priority.cmp(&a.priority));

    let answer = answers.get(question_id);
    let mut next: Vec<String> = Vec::new();

    for transition in &transitions {
        if transition.is_default {
            // Defaults apply only if nothing else matched.
            continue;
        }
        if condition::evaluate(transition.operator, answer, transition.comparand.as_ref()) {
            push_targets(&mut next, transition);
            // First match wins; lower-priority transitions are not evaluated.
            break;
        }
    }

    if next.is_empty() {
        if let Some(default) = transitions.iter().find(|t| t.is_default) {
            push_targets(&mut next, default);
        }
    }

    next
}

fn push_targets(next: &mut Vec<String>, transition: &Transition) {
    for id in &transition.next_question_ids {
        if !next.contains(id) {
            next.push(id.clone());
        }
    }
}

/// Compute the visible path: BFS from all initial questions, output in the
/// configuration's declared question order restricted to the visited set
/// (not BFS discovery order).
pub fn resolve_visible_path(
    config: &Configuration,
    answers: &BTreeMap<String, AnswerValue>,
) -> Vec<Question> {
    let mut visited: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<String> = config
        .initial_questions()
        .map(|q| q.id.clone())
        .collect();

    while let Some(question_id) = queue.pop_front() {
        if !visited.insert(question_id.clone()) {
            continue;
        }
        for next_id in next_question_ids(config, &question_id, answers) {
            if !visited.contains(&next_id) {
                queue.push_back(next_id);
            }
        }
    }

    config
        .questions
        .iter()
        .filter(|q| visited.contains(&q.id))
        .cloned()
        .collect()
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use checkpath_core::{
        Basics, Operator, QuestionKind, ScalarValue, ValidationRules,
    };

    fn question(id: &str, initial: bool) -> Question {
        Question {
            id: id.to_string(),
            text: format!("{}?", id),
            kind: QuestionKind::Text,
            options: Vec::new(),
            validation: ValidationRules::default(),
            is_initial: initial,
        }
    }

    fn transition(
        id: &str,
        from: &str,
        operator: Operator,
        comparand: Option<AnswerValue>,
        to: &[&str],
        priority: i32,
        is_default: bool,
    ) -> Transition {
        Transition {
            id: id.to_string(),
            from_question_id: from.to_string(),
            operator,
            comparand,
            next_question_ids: to.iter().map(|s| s.to_string()).collect(),
            priority,
            is_default,
        }
    }

    fn config(questions: Vec<Question>, transitions: Vec<Transition>) -> Configuration {
        Configuration {
            basics: Basics {
                name: "t".to_string(),
                description: None,
                expected_duration_minutes: None,
                allow_backtrack: false,
                max_depth: 10,
                require_answers: false,
            },
            questions,
            transitions,
            outcomes: Vec::new(),
        }
    }

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, AnswerValue> {
        pairs
            .iter()
            .map(|(q, v)| (q.to_string(), AnswerValue::text(*v)))
            .collect()
    }

    fn path_ids(config: &Configuration, answers: &BTreeMap<String, AnswerValue>) -> Vec<String> {
        resolve_visible_path(config, answers)
            .into_iter()
            .map(|q| q.id)
            .collect()
    }

    #[test]
    fn single_initial_question_no_transitions() {
        let config = config(vec![question("q1", true)], Vec::new());
        assert_eq!(path_ids(&config, &BTreeMap::new()), vec!["q1"]);
    }

    #[test]
    fn resolution_is_idempotent_for_unchanged_answers() {
        let config = config(
            vec![question("a", true), question("b", false)],
            vec![transition(
                "t1",
                "a",
                Operator::Equals,
                Some(AnswerValue::text("yes")),
                &["b"],
                10,
                false,
            )],
        );
        let answers = answers(&[("a", "yes")]);
        let first = path_ids(&config, &answers);
        let second = path_ids(&config, &answers);
        assert_eq!(first, second);
        assert_eq!(first, vec!["a", "b"]);
    }

    #[test]
    fn first_match_wins_by_descending_priority() {
        // Both conditions hold; only the priority-10 targets are used.
        let config = config(
            vec![question("a", true), question("hi", false), question("lo", false)],
            vec![
                transition(
                    "t-lo",
                    "a",
                    Operator::IsNotEmpty,
                    None,
                    &["lo"],
                    5,
                    false,
                ),
                transition(
                    "t-hi",
                    "a",
                    Operator::IsNotEmpty,
                    None,
                    &["hi"],
                    10,
                    false,
                ),
            ],
        );
        let next = next_question_ids(&config, "a", &answers(&[("a", "x")]));
        assert_eq!(next, vec!["hi"]);
    }

    #[test]
    fn default_transition_used_only_when_nothing_matched() {
        let config = config(
            vec![
                question("a", true),
                question("matched", false),
                question("fallback", false),
            ],
            vec![
                transition(
                    "t1",
                    "a",
                    Operator::Equals,
                    Some(AnswerValue::text("yes")),
                    &["matched"],
                    10,
                    false,
                ),
                transition("t-def", "a", Operator::Unknown, None, &["fallback"], 0, true),
            ],
        );

        assert_eq!(
            next_question_ids(&config, "a", &answers(&[("a", "yes")])),
            vec!["matched"]
        );
        assert_eq!(
            next_question_ids(&config, "a", &answers(&[("a", "no")])),
            vec!["fallback"]
        );
        // Unanswered also falls through to the default
        assert_eq!(
            next_question_ids(&config, "a", &BTreeMap::new()),
            vec!["fallback"]
        );
    }

    #[test]
    fn unanswered_question_is_a_leaf_without_default() {
        let config = config(
            vec![question("a", true), question("b", false)],
            vec![transition(
                "t1",
                "a",
                Operator::Equals,
                Some(AnswerValue::text("yes")),
                &["b"],
                10,
                false,
            )],
        );
        assert!(next_question_ids(&config, "a", &BTreeMap::new()).is_empty());
        assert_eq!(path_ids(&config, &BTreeMap::new()), vec!["a"]);
    }

    #[test]
    fn cyclic_configuration_terminates() {
        let config = config(
            vec![question("a", true), question("b", false)],
            vec![
                transition("t1", "a", Operator::IsNotEmpty, None, &["b"], 10, false),
                transition("t2", "b", Operator::IsNotEmpty, None, &["a"], 10, false),
            ],
        );
        let ids = path_ids(&config, &answers(&[("a", "x"), ("b", "y")]));
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn output_follows_declaration_order_not_discovery_order() {
        // a routes to c; c routes to b. Declaration order is a, b, c.
        let config = config(
            vec![question("a", true), question("b", false), question("c", false)],
            vec![
                transition("t1", "a", Operator::IsNotEmpty, None, &["c"], 10, false),
                transition("t2", "c", Operator::IsNotEmpty, None, &["b"], 10, false),
            ],
        );
        let ids = path_ids(&config, &answers(&[("a", "x"), ("c", "y")]));
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn multiple_initial_questions_seed_the_walk() {
        let config = config(
            vec![question("a", true), question("b", true), question("c", false)],
            vec![transition("t1", "b", Operator::IsNotEmpty, None, &["c"], 10, false)],
        );
        let ids = path_ids(&config, &answers(&[("b", "x")]));
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn in_operator_routes_on_membership() {
        let members = AnswerValue::Many(vec![
            ScalarValue::Text("rota".to_string()),
            ScalarValue::Text("sumida".to_string()),
        ]);
        let config = config(
            vec![question("a", true), question("damage", false)],
            vec![transition(
                "t1",
                "a",
                Operator::In,
                Some(members),
                &["damage"],
                10,
                false,
            )],
        );
        assert_eq!(
            path_ids(&config, &answers(&[("a", "sumida")])),
            vec!["a", "damage"]
        );
        assert_eq!(path_ids(&config, &answers(&[("a", "buena")])), vec!["a"]);
    }
}
