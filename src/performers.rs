use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;

use crate::models::{ExamMarkRecord, ExamRecord, TopPerformer};

pub const TOP_PERFORMER_EXAMS: usize = 5;

#[derive(Debug, Default)]
struct Tally<'a> {
    name: &'a str,
    score: f64,
    max: f64,
}

/// Best student per recent exam. Sub-question rows are skipped; ties go to the
/// lowest student id.
pub fn top_performers(exams: &[ExamRecord], marks: &[ExamMarkRecord]) -> Vec<TopPerformer> {
    let mut by_exam: HashMap<&str, BTreeMap<&str, Tally>> = HashMap::new();
    for mark in marks {
        if mark.parent_part_id.is_some() || mark.exam_id.is_empty() || mark.student_id.is_empty() {
            continue;
        }
        let tally = by_exam
            .entry(mark.exam_id.as_str())
            .or_default()
            .entry(mark.student_id.as_str())
            .or_default();
        if tally.name.is_empty() {
            tally.name = mark.student_name.as_str();
        }
        tally.score += mark.score_awarded;
        tally.max += mark.max_marks;
    }

    let mut recent: Vec<&ExamRecord> = exams.iter().collect();
    recent.sort_by_key(|exam| std::cmp::Reverse(sort_date(exam)));

    recent
        .into_iter()
        .filter_map(|exam| {
            let students = by_exam.get(exam.id.as_str())?;
            best_student(exam, students)
        })
        .take(TOP_PERFORMER_EXAMS)
        .collect()
}

fn sort_date(exam: &ExamRecord) -> Option<NaiveDateTime> {
    exam.exam_date.or(exam.created_at)
}

fn best_student(exam: &ExamRecord, students: &BTreeMap<&str, Tally>) -> Option<TopPerformer> {
    let mut best: Option<(&str, &Tally, u32)> = None;
    for (student_id, tally) in students {
        if tally.max <= 0.0 {
            continue;
        }
        let percentage = (tally.score / tally.max * 100.0).round() as u32;
        if best.map_or(true, |(_, _, top)| percentage > top) {
            best = Some((*student_id, tally, percentage));
        }
    }

    best.map(|(student_id, tally, percentage)| TopPerformer {
        exam_id: exam.id.clone(),
        exam_title: exam.title.clone(),
        student_id: student_id.to_string(),
        student_name: if tally.name.is_empty() {
            student_id.to_string()
        } else {
            tally.name.to_string()
        },
        percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_exam(id: &str, day: u32) -> ExamRecord {
        ExamRecord {
            id: id.to_string(),
            title: format!("Exam {id}"),
            class_id: "c1".to_string(),
            exam_date: NaiveDate::from_ymd_opt(2026, 3, day).and_then(|d| d.and_hms_opt(9, 0, 0)),
            created_at: None,
        }
    }

    fn sample_mark(exam: &str, student: &str, score: f64, max: f64) -> ExamMarkRecord {
        ExamMarkRecord {
            exam_id: exam.to_string(),
            student_id: student.to_string(),
            student_name: format!("Student {student}"),
            score_awarded: score,
            max_marks: max,
            parent_part_id: None,
        }
    }

    #[test]
    fn highest_percentage_wins() {
        let exams = vec![sample_exam("e1", 1)];
        let marks = vec![
            sample_mark("e1", "s1", 80.0, 100.0),
            sample_mark("e1", "s2", 90.0, 100.0),
        ];

        let performers = top_performers(&exams, &marks);
        assert_eq!(performers.len(), 1);
        assert_eq!(performers[0].student_id, "s2");
        assert_eq!(performers[0].student_name, "Student s2");
        assert_eq!(performers[0].percentage, 90);
    }

    #[test]
    fn parts_are_not_double_counted() {
        let exams = vec![sample_exam("e1", 1)];
        let mut part = sample_mark("e1", "s1", 50.0, 50.0);
        part.parent_part_id = Some("q1".to_string());
        let marks = vec![
            sample_mark("e1", "s1", 30.0, 50.0),
            sample_mark("e1", "s1", 40.0, 50.0),
            part,
            sample_mark("e1", "s2", 60.0, 100.0),
        ];

        let performers = top_performers(&exams, &marks);
        assert_eq!(performers[0].student_id, "s1");
        assert_eq!(performers[0].percentage, 70);
    }

    #[test]
    fn zero_max_marks_are_skipped_and_ties_go_to_lowest_id() {
        let exams = vec![sample_exam("e1", 1), sample_exam("e2", 2)];
        let marks = vec![
            sample_mark("e1", "s9", 50.0, 0.0),
            sample_mark("e1", "s3", 45.0, 50.0),
            sample_mark("e1", "s2", 90.0, 100.0),
            sample_mark("e2", "s1", 0.0, 0.0),
        ];

        let performers = top_performers(&exams, &marks);
        assert_eq!(performers.len(), 1);
        assert_eq!(performers[0].exam_id, "e1");
        assert_eq!(performers[0].student_id, "s2");
    }

    #[test]
    fn only_the_five_most_recent_exams_are_reported() {
        let exams: Vec<ExamRecord> = (1..=7)
            .map(|day| sample_exam(&format!("e{day}"), day))
            .collect();
        let marks: Vec<ExamMarkRecord> = (1..=7)
            .map(|day| sample_mark(&format!("e{day}"), "s1", 70.0, 100.0))
            .collect();

        let performers = top_performers(&exams, &marks);
        let ids: Vec<&str> = performers.iter().map(|p| p.exam_id.as_str()).collect();
        assert_eq!(ids, vec!["e7", "e6", "e5", "e4", "e3"]);
    }
}
