use std::collections::{HashMap, HashSet};

use academy_core::model::{
    Answer, AnswerId, Assessment, CourseItemId, CourseItemKind, Question, QuestionId,
    QuestionKind, ReadPercent, RequiredItem,
};
use academy_core::progress::aggregate;
use academy_core::scoring::{QuestionOutcome, Submission, grade, percent_of};
use proptest::prelude::*;
use serde_json::json;

fn multi_question(flags: &[bool], points: u32) -> Question {
    Question {
        id: QuestionId::new(1),
        kind: QuestionKind::Multi,
        text: "pick all".into(),
        points,
        position: 0,
        answers: flags
            .iter()
            .enumerate()
            .map(|(i, &is_correct)| Answer {
                id: AnswerId::new(i as u64 + 1),
                text: format!("option {i}"),
                is_correct,
                position: i as u32,
            })
            .collect(),
    }
}

fn single_assessment(questions: Vec<Question>, min_pass_score: u32) -> Assessment {
    Assessment {
        course_item_id: CourseItemId::new(1),
        min_pass_score,
        attempts_limit: None,
        time_limit_sec: None,
        shuffle_questions: false,
        questions,
    }
}

proptest! {
    #[test]
    fn multi_is_correct_only_for_the_exact_set(
        flags in prop::collection::vec(any::<bool>(), 1..6),
        picks in prop::collection::vec(any::<bool>(), 6),
        points in 0_u32..10,
    ) {
        let question = multi_question(&flags, points);
        let correct: HashSet<u64> = question.correct_answer_ids().iter().map(AnswerId::value).collect();
        let selected: Vec<u64> = (1..=flags.len() as u64).filter(|i| picks[(*i - 1) as usize]).collect();
        let selected_set: HashSet<u64> = selected.iter().copied().collect();

        // duplicates and ordering must not matter
        let mut payload: Vec<u64> = selected.iter().rev().copied().collect();
        payload.extend(selected.iter().copied());

        let assessment = single_assessment(vec![question], 0);
        let graded = grade(&assessment, &Submission::new().with(QuestionId::new(1), json!(payload)));
        let outcome = graded.results[0].outcome;

        if selected.is_empty() {
            prop_assert_eq!(outcome, QuestionOutcome::Skipped);
        } else if !correct.is_empty() && selected_set == correct {
            prop_assert_eq!(outcome, QuestionOutcome::Correct);
            prop_assert_eq!(graded.score, points);
        } else {
            prop_assert_eq!(outcome, QuestionOutcome::Wrong);
            prop_assert_eq!(graded.score, 0);
        }
    }

    #[test]
    fn impossible_id_spoils_an_exact_selection(
        flags in prop::collection::vec(any::<bool>(), 1..6),
        extra in prop_oneof![
            Just(json!(0)),
            (i64::MIN..0).prop_map(|v| json!(v)),
            (1_u32..1000).prop_map(|v| json!(f64::from(v) + 0.5)),
            (1_i64..1000).prop_map(|v| json!((-v).to_string())),
        ],
        at in 0_usize..6,
    ) {
        prop_assume!(flags.iter().any(|&f| f));
        let question = multi_question(&flags, 3);
        let mut payload: Vec<serde_json::Value> = question
            .correct_answer_ids()
            .iter()
            .map(|id| json!(id.value()))
            .collect();
        payload.insert(at.min(payload.len()), extra);

        let assessment = single_assessment(vec![question], 1);
        let graded = grade(&assessment, &Submission::new().with(QuestionId::new(1), json!(payload)));

        prop_assert_eq!(graded.results[0].outcome, QuestionOutcome::Wrong);
        prop_assert_eq!(graded.score, 0);
        prop_assert!(!graded.passed);
    }

    #[test]
    fn score_never_exceeds_total(
        specs in prop::collection::vec((0_u32..20, any::<bool>(), 0_u64..4), 0..8),
    ) {
        let mut submission = Submission::new();
        let questions = specs
            .iter()
            .enumerate()
            .map(|(i, &(points, first_correct, pick))| {
                let id = QuestionId::new(i as u64 + 1);
                if pick > 0 {
                    submission.insert(id, pick + (i as u64) * 10);
                }
                Question {
                    id,
                    kind: QuestionKind::Single,
                    text: String::new(),
                    points,
                    position: i as u32,
                    answers: vec![
                        Answer { id: AnswerId::new((i as u64) * 10 + 1), text: String::new(), is_correct: first_correct, position: 0 },
                        Answer { id: AnswerId::new((i as u64) * 10 + 2), text: String::new(), is_correct: !first_correct, position: 1 },
                    ],
                }
            })
            .collect();

        let assessment = single_assessment(questions, 5);
        let graded = grade(&assessment, &submission);

        prop_assert!(graded.score <= graded.total_points);
        prop_assert_eq!(graded.percent, percent_of(graded.score, graded.total_points));
        prop_assert_eq!(graded.passed, graded.score >= 5);
        prop_assert_eq!(
            graded.stats.correct + graded.stats.wrong + graded.stats.skipped,
            graded.stats.questions
        );
    }

    #[test]
    fn read_merge_is_order_independent(reports in prop::collection::vec(-50.0_f64..150.0, 1..12)) {
        let mut stored = ReadPercent::ZERO;
        for r in &reports {
            let next = stored.merge(ReadPercent::from_reported(*r).unwrap());
            prop_assert!(next >= stored);
            stored = next;
        }
        let best = reports
            .iter()
            .map(|r| ReadPercent::from_reported(*r).unwrap())
            .max()
            .unwrap();
        prop_assert_eq!(stored, best);
    }

    #[test]
    fn partial_reads_alone_never_finish(percents in prop::collection::vec(0_u8..=100, 1..6)) {
        let required: Vec<RequiredItem> = (1..=percents.len() as u64)
            .map(|id| RequiredItem { id: CourseItemId::new(id), kind: CourseItemKind::Chapter })
            .collect();
        let read: HashMap<CourseItemId, ReadPercent> = percents
            .iter()
            .enumerate()
            .map(|(i, p)| (CourseItemId::new(i as u64 + 1), ReadPercent::new(*p).unwrap()))
            .collect();

        let snap = aggregate(&required, &HashSet::new(), &read);
        prop_assert!(!snap.finished);
        prop_assert!(snap.progress_percent <= 100);
        let again = aggregate(&required, &HashSet::new(), &read);
        prop_assert_eq!(snap, again);
    }
}
