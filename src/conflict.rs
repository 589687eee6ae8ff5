//! Conflict model: which sections must never meet in the same timeslot.
//!
//! Two sections conflict when they share a student, or when their courses
//! are taught by the same faculty member in the week in question. The
//! relation is kept as two inverted indices (student → sections and
//! faculty → courses) plus sparse per-section neighbour lists; it is never
//! materialized as a dense section × section matrix.
//!
//! The model is built once from the final sections and is read-only for the
//! rest of the run.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::models::{Course, Section, TermInput};

/// Teaching faculty of a course, by index into the faculty table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FacultyPlan {
    primary: usize,
    handover: Option<(u32, usize)>,
}

impl FacultyPlan {
    #[inline]
    fn in_week(&self, week: u32) -> usize {
        match self.handover {
            Some((from, f)) if week >= from => f,
            _ => self.primary,
        }
    }
}

/// Indexed must-not-coincide relation over sections.
#[derive(Debug, Clone, Default)]
pub struct ConflictModel {
    section_ids: Vec<String>,
    section_course: Vec<usize>,
    section_sizes: Vec<usize>,
    section_lookup: HashMap<String, usize>,
    course_ids: Vec<String>,
    course_sections: Vec<Vec<usize>>,
    course_faculty: Vec<FacultyPlan>,
    faculty_ids: Vec<String>,
    faculty_courses: Vec<Vec<usize>>,
    student_ids: Vec<String>,
    student_sections: Vec<Vec<usize>>,
    student_neighbors: Vec<Vec<usize>>,
}

impl ConflictModel {
    /// Builds the model from sections and the courses that own them.
    ///
    /// Sections whose course is missing from `courses` are taught by an
    /// anonymous faculty of their own and only conflict through students.
    pub fn build(sections: &[Section], courses: &[Course]) -> Self {
        let mut model = ConflictModel::default();
        let mut faculty_lookup: HashMap<String, usize> = HashMap::new();
        let mut course_lookup: HashMap<&str, usize> = HashMap::new();

        let mut intern_faculty = |name: &str, model: &mut ConflictModel| -> usize {
            if let Some(&f) = faculty_lookup.get(name) {
                return f;
            }
            let f = model.faculty_ids.len();
            model.faculty_ids.push(name.to_string());
            model.faculty_courses.push(Vec::new());
            faculty_lookup.insert(name.to_string(), f);
            f
        };

        for course in courses {
            let c = model.course_ids.len();
            course_lookup.insert(course.id.as_str(), c);
            model.course_ids.push(course.id.clone());
            model.course_sections.push(Vec::new());
            let primary = intern_faculty(&course.faculty, &mut model);
            let handover = course
                .handover
                .as_ref()
                .map(|h| (h.from_week, intern_faculty(&h.faculty, &mut model)));
            model.faculty_courses[primary].push(c);
            if let Some((_, f)) = handover {
                if f != primary {
                    model.faculty_courses[f].push(c);
                }
            }
            model.course_faculty.push(FacultyPlan { primary, handover });
        }

        let mut student_lookup: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (s, section) in sections.iter().enumerate() {
            let c = match course_lookup.get(section.course_id.as_str()) {
                Some(&c) => c,
                None => {
                    let c = model.course_ids.len();
                    course_lookup.insert(section.course_id.as_str(), c);
                    model.course_ids.push(section.course_id.clone());
                    model.course_sections.push(Vec::new());
                    let f = intern_faculty(&format!("<{}>", section.course_id), &mut model);
                    model.faculty_courses[f].push(c);
                    model.course_faculty.push(FacultyPlan {
                        primary: f,
                        handover: None,
                    });
                    c
                }
            };
            model.section_lookup.insert(section.id.clone(), s);
            model.section_ids.push(section.id.clone());
            model.section_course.push(c);
            model.section_sizes.push(section.size());
            model.course_sections[c].push(s);
            for student in &section.students {
                student_lookup.entry(student.as_str()).or_default().push(s);
            }
        }

        let mut neighbors = vec![Vec::new(); sections.len()];
        for (student, secs) in student_lookup {
            for &a in &secs {
                for &b in &secs {
                    if a != b {
                        neighbors[a].push(b);
                    }
                }
            }
            model.student_ids.push(student.to_string());
            model.student_sections.push(secs);
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }
        model.student_neighbors = neighbors;
        model
    }

    /// Number of sections in the model.
    pub fn section_count(&self) -> usize {
        self.section_ids.len()
    }

    /// Number of distinct faculty members.
    pub fn faculty_count(&self) -> usize {
        self.faculty_ids.len()
    }

    /// Number of distinct students.
    pub fn student_count(&self) -> usize {
        self.student_ids.len()
    }

    /// Section id at index `s`.
    pub fn section_id(&self, s: usize) -> &str {
        &self.section_ids[s]
    }

    /// Index of a section id.
    pub fn index_of(&self, section_id: &str) -> Option<usize> {
        self.section_lookup.get(section_id).copied()
    }

    /// Number of students in section `s`.
    pub fn size(&self, s: usize) -> usize {
        self.section_sizes[s]
    }

    /// Course index of section `s`.
    pub fn course_of(&self, s: usize) -> usize {
        self.section_course[s]
    }

    /// Course id of section `s`.
    pub fn course_id_of(&self, s: usize) -> &str {
        &self.course_ids[self.section_course[s]]
    }

    /// Sections of course index `c`.
    pub fn sections_of_course(&self, c: usize) -> &[usize] {
        &self.course_sections[c]
    }

    /// Number of courses in the model.
    pub fn course_count(&self) -> usize {
        self.course_ids.len()
    }

    /// Faculty index teaching section `s` in `week`.
    pub fn faculty_of(&self, s: usize, week: u32) -> usize {
        self.course_faculty[self.section_course[s]].in_week(week)
    }

    /// Faculty id by index.
    pub fn faculty_id(&self, f: usize) -> &str {
        &self.faculty_ids[f]
    }

    /// Courses taught (at some point of the term) by faculty `f`.
    pub fn courses_of_faculty(&self, f: usize) -> &[usize] {
        &self.faculty_courses[f]
    }

    /// Whether the course of section `s` changes faculty mid-term.
    pub fn has_handover(&self, s: usize) -> bool {
        self.course_faculty[self.section_course[s]].handover.is_some()
    }

    /// Student id and sections by student index.
    pub fn student(&self, i: usize) -> (&str, &[usize]) {
        (&self.student_ids[i], &self.student_sections[i])
    }

    /// Sections sharing at least one student with `s` (sorted, excludes `s`).
    pub fn student_neighbors(&self, s: usize) -> &[usize] {
        &self.student_neighbors[s]
    }

    /// Whether sections `a` and `b` share a student.
    pub fn shares_student(&self, a: usize, b: usize) -> bool {
        self.student_neighbors[a].binary_search(&b).is_ok()
    }

    /// Whether sections `a` and `b` share a faculty member in `week`.
    pub fn shares_faculty(&self, a: usize, b: usize, week: u32) -> bool {
        self.faculty_of(a, week) == self.faculty_of(b, week)
    }

    /// Whether two distinct sections must not meet in the same slot of `week`.
    pub fn conflicts(&self, a: usize, b: usize, week: u32) -> bool {
        a != b && (self.shares_student(a, b) || self.shares_faculty(a, b, week))
    }

    /// Among `occupants` of a slot in `week`, the sections conflicting with `s`.
    pub fn conflicting_in(&self, s: usize, week: u32, occupants: &[usize]) -> Vec<usize> {
        occupants
            .iter()
            .copied()
            .filter(|&o| self.conflicts(s, o, week))
            .collect()
    }

    /// Sections sharing a faculty member with `s` in `week` (excludes `s`).
    pub fn faculty_neighbors(&self, s: usize, week: u32) -> Vec<usize> {
        let f = self.faculty_of(s, week);
        let mut out: Vec<usize> = self.faculty_courses[f]
            .iter()
            .flat_map(|&c| self.course_sections[c].iter().copied())
            .filter(|&o| o != s && self.faculty_of(o, week) == f)
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    /// Number of sections conflicting with `s` in `week`.
    pub fn degree(&self, s: usize, week: u32) -> usize {
        let faculty = self.faculty_neighbors(s, week);
        let shared = faculty
            .iter()
            .filter(|&&o| self.shares_student(s, o))
            .count();
        self.student_neighbors[s].len() + faculty.len() - shared
    }

    /// Number of unordered section pairs sharing a student.
    pub fn student_conflict_pairs(&self) -> usize {
        self.student_neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }
}

/// Two courses and the number of students they have in common.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseOverlap {
    pub first: String,
    pub second: String,
    pub common_students: usize,
}

/// Course pairs with common students, most overlapping first.
pub fn course_overlaps(input: &TermInput) -> Vec<CourseOverlap> {
    let mut pairs: BTreeMap<(String, String), usize> = BTreeMap::new();
    for student in input.students() {
        let courses: Vec<&String> = student.courses.iter().collect();
        for i in 0..courses.len() {
            for j in (i + 1)..courses.len() {
                *pairs
                    .entry((courses[i].clone(), courses[j].clone()))
                    .or_insert(0) += 1;
            }
        }
    }
    let mut out: Vec<CourseOverlap> = pairs
        .into_iter()
        .map(|((first, second), common_students)| CourseOverlap {
            first,
            second,
            common_students,
        })
        .collect();
    out.sort_by(|a, b| b.common_students.cmp(&a.common_students));
    out
}
