//! Operations over the in-memory student collection.
//!
//! Nothing here touches the disk; callers load the collection, run one of these,
//! and save it again when it changed.

use chrono::{DateTime, Utc};

use crate::err::Error;
use crate::models::{NewStudent, Session, StudentEdit, StudentRecord, StudentRow, MAX_MARKS};

fn check_marks(marks: u8) -> Result<(), Error> {
    if marks > MAX_MARKS {
        return Err(Error::Validation {
            message: format!("Marks must be between 0 and {}.", MAX_MARKS),
        });
    }
    Ok(())
}

fn position(records: &[StudentRecord], roll: &str) -> Option<usize> {
    records.iter().position(|s| s.roll == roll)
}

pub fn add<'a>(
    records: &'a mut Vec<StudentRecord>,
    student: NewStudent,
    now: DateTime<Utc>,
) -> Result<&'a StudentRecord, Error> {
    if student.name.is_empty() || student.roll.is_empty() {
        return Err(Error::Validation {
            message: "Name and Roll are required.".to_string(),
        });
    }
    check_marks(student.marks)?;
    if position(records, &student.roll).is_some() {
        return Err(Error::DuplicateKey {
            message: "A student with this roll already exists.".to_string(),
        });
    }

    records.push(StudentRecord {
        name: student.name,
        roll: student.roll,
        course: student.course,
        year: student.year,
        marks: student.marks,
        phone: student.phone,
        email: student.email,
        created_at: now,
    });
    Ok(&records[records.len() - 1])
}

pub fn list(records: &[StudentRecord]) -> Vec<StudentRow> {
    records.iter().map(StudentRow::from).collect()
}

pub fn search<'a>(records: &'a [StudentRecord], roll: &str) -> Result<&'a StudentRecord, Error> {
    records
        .iter()
        .find(|s| s.roll == roll)
        .ok_or_else(|| Error::not_found("No record found."))
}

/// Snapshot of a record, to be held as edit scratch state until saved or cleared.
pub fn load_for_edit(records: &[StudentRecord], roll: &str) -> Result<StudentRecord, Error> {
    search(records, roll).cloned()
}

/// Applies `edit` to the record the snapshot was taken from. The lookup key is
/// always the snapshot's roll; `roll` and `created_at` are kept as stored.
pub fn save_edit<'a>(
    records: &'a mut [StudentRecord],
    snapshot: &StudentRecord,
    edit: StudentEdit,
) -> Result<&'a StudentRecord, Error> {
    check_marks(edit.marks)?;
    let idx = position(records, &snapshot.roll)
        .ok_or_else(|| Error::not_found("No record found."))?;

    let record = &mut records[idx];
    record.name = edit.name;
    record.course = edit.course;
    record.year = edit.year;
    record.marks = edit.marks;
    record.phone = edit.phone;
    record.email = edit.email;
    Ok(record)
}

/// Removes every record with this roll and reports how many went.
pub fn delete(records: &mut Vec<StudentRecord>, roll: &str) -> Result<usize, Error> {
    let before = records.len();
    records.retain(|s| s.roll != roll);
    match before - records.len() {
        0 => Err(Error::not_found("No such roll number.")),
        removed => Ok(removed),
    }
}

/// The only record a student session can ever reach.
pub fn view_own<'a>(
    records: &'a [StudentRecord],
    session: &Session,
) -> Result<&'a StudentRecord, Error> {
    let roll = session.require_student()?;
    records
        .iter()
        .find(|s| s.roll == roll)
        .ok_or_else(|| Error::not_found("Record not found. Contact admin."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Year;
    use std::collections::HashSet;

    fn asha() -> NewStudent {
        NewStudent {
            name: "Asha Rao".to_string(),
            roll: "R001".to_string(),
            course: "CS".to_string(),
            year: Year::Second,
            marks: 88,
            phone: "9999999999".to_string(),
            email: "a@x.com".to_string(),
        }
    }

    fn student(roll: &str) -> NewStudent {
        NewStudent {
            name: format!("Student {}", roll),
            roll: roll.to_string(),
            ..NewStudent::default()
        }
    }

    fn rolls_unique(records: &[StudentRecord]) -> bool {
        let set: HashSet<&str> = records.iter().map(|s| s.roll.as_str()).collect();
        set.len() == records.len()
    }

    #[test]
    fn add_then_search_returns_supplied_fields() {
        let mut records = Vec::new();
        let now = Utc::now();
        add(&mut records, asha(), now).unwrap();

        let found = search(&records, "R001").unwrap();
        assert_eq!(found.name, "Asha Rao");
        assert_eq!(found.course, "CS");
        assert_eq!(found.year, Year::Second);
        assert_eq!(found.marks, 88);
        assert_eq!(found.phone, "9999999999");
        assert_eq!(found.email, "a@x.com");
        assert_eq!(found.created_at, now);
    }

    #[test]
    fn add_then_delete_then_search_is_not_found() {
        let mut records = Vec::new();
        add(&mut records, asha(), Utc::now()).unwrap();
        assert_eq!(delete(&mut records, "R001").unwrap(), 1);
        assert!(matches!(search(&records, "R001"), Err(Error::NotFound { .. })));
    }

    #[test]
    fn add_requires_name_and_roll() {
        let mut records = Vec::new();
        let no_name = NewStudent {
            name: String::new(),
            ..asha()
        };
        let no_roll = NewStudent {
            roll: String::new(),
            ..asha()
        };
        assert!(matches!(
            add(&mut records, no_name, Utc::now()),
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            add(&mut records, no_roll, Utc::now()),
            Err(Error::Validation { .. })
        ));
        assert!(records.is_empty());
    }

    #[test]
    fn add_rejects_marks_above_hundred() {
        let mut records = Vec::new();
        let over = NewStudent { marks: 101, ..asha() };
        assert!(matches!(
            add(&mut records, over, Utc::now()),
            Err(Error::Validation { .. })
        ));
        assert!(records.is_empty());
    }

    #[test]
    fn duplicate_roll_leaves_collection_unchanged() {
        let mut records = Vec::new();
        add(&mut records, asha(), Utc::now()).unwrap();
        let before = records.clone();

        let again = NewStudent {
            name: "Someone Else".to_string(),
            ..asha()
        };
        assert!(matches!(
            add(&mut records, again, Utc::now()),
            Err(Error::DuplicateKey { .. })
        ));
        assert_eq!(records, before);
    }

    #[test]
    fn delete_missing_roll_leaves_collection_unchanged() {
        let mut records = Vec::new();
        add(&mut records, asha(), Utc::now()).unwrap();
        let before = records.clone();

        assert!(matches!(delete(&mut records, "R404"), Err(Error::NotFound { .. })));
        assert_eq!(records, before);
    }

    #[test]
    fn delete_removes_exactly_that_record() {
        let mut records = Vec::new();
        for roll in ["R001", "R002", "R003"] {
            add(&mut records, student(roll), Utc::now()).unwrap();
        }
        delete(&mut records, "R002").unwrap();

        let rolls: Vec<&str> = records.iter().map(|s| s.roll.as_str()).collect();
        assert_eq!(rolls, vec!["R001", "R003"]);
    }

    #[test]
    fn rolls_stay_unique_across_add_and_delete() {
        let mut records = Vec::new();
        let script = [
            ("add", "A"),
            ("add", "B"),
            ("add", "A"),
            ("del", "A"),
            ("add", "A"),
            ("del", "C"),
            ("add", "B"),
            ("add", "C"),
        ];
        for (op, roll) in script {
            let _ = match op {
                "add" => add(&mut records, student(roll), Utc::now()).map(|_| ()),
                _ => delete(&mut records, roll).map(|_| ()),
            };
            assert!(rolls_unique(&records));
        }
        assert_eq!(records.len(), 3);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use proptest::test_runner::Config;
        use std::collections::BTreeSet;

        proptest! {
            #![proptest_config(Config::with_cases(256))]
            #[test]
            fn rolls_unique_under_any_add_delete_sequence(
                ops in prop::collection::vec((any::<bool>(), 0_u8..6_u8), 0..64)
            ) {
                let mut records = Vec::new();
                let mut expected = BTreeSet::new();
                for (is_add, n) in ops {
                    let roll = format!("R{:03}", n);
                    if is_add {
                        let added = add(&mut records, student(&roll), Utc::now()).is_ok();
                        prop_assert_eq!(added, expected.insert(roll));
                    } else {
                        let deleted = delete(&mut records, &roll).is_ok();
                        prop_assert_eq!(deleted, expected.remove(&roll));
                    }
                    prop_assert!(rolls_unique(&records));
                    prop_assert_eq!(records.len(), expected.len());
                }
            }
        }
    }

    #[test]
    fn list_projects_in_collection_order() {
        let mut records = Vec::new();
        add(&mut records, student("R010"), Utc::now()).unwrap();
        add(&mut records, asha(), Utc::now()).unwrap();

        let rows = list(&records);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].roll, "R010");
        assert_eq!(rows[1], StudentRow::from(&records[1]));
    }

    #[test]
    fn save_edit_keeps_roll_and_created_at() {
        let mut records = Vec::new();
        let created = Utc::now();
        add(&mut records, asha(), created).unwrap();

        let snapshot = load_for_edit(&records, "R001").unwrap();
        let edit = StudentEdit {
            name: "Asha R.".to_string(),
            course: "EE".to_string(),
            year: Year::Third,
            marks: 91,
            phone: "1234".to_string(),
            email: "asha@x.com".to_string(),
        };
        save_edit(&mut records, &snapshot, edit).unwrap();

        let found = search(&records, "R001").unwrap();
        assert_eq!(found.roll, "R001");
        assert_eq!(found.created_at, created);
        assert_eq!(found.name, "Asha R.");
        assert_eq!(found.course, "EE");
        assert_eq!(found.year, Year::Third);
        assert_eq!(found.marks, 91);
        assert_eq!(found.phone, "1234");
        assert_eq!(found.email, "asha@x.com");
    }

    #[test]
    fn save_edit_after_record_vanished_is_not_found() {
        let mut records = Vec::new();
        add(&mut records, asha(), Utc::now()).unwrap();
        let snapshot = load_for_edit(&records, "R001").unwrap();
        delete(&mut records, "R001").unwrap();

        assert!(matches!(
            save_edit(&mut records, &snapshot, StudentEdit::default()),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn load_for_edit_missing_is_not_found() {
        let records: Vec<StudentRecord> = Vec::new();
        assert!(matches!(
            load_for_edit(&records, "R001"),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn view_own_only_sees_session_roll() {
        let mut records = Vec::new();
        add(&mut records, asha(), Utc::now()).unwrap();
        add(&mut records, student("R002"), Utc::now()).unwrap();

        let session = Session::Student("R002".to_string());
        assert_eq!(view_own(&records, &session).unwrap().roll, "R002");

        delete(&mut records, "R002").unwrap();
        let err = view_own(&records, &session).unwrap_err();
        assert_eq!(err.message(), "Record not found. Contact admin.");
    }

    #[test]
    fn view_own_requires_student_session() {
        let records = Vec::new();
        assert!(matches!(
            view_own(&records, &Session::Admin("admin".to_string())),
            Err(Error::Forbidden { .. })
        ));
        assert!(matches!(
            view_own(&records, &Session::Anonymous),
            Err(Error::Forbidden { .. })
        ));
    }
}
