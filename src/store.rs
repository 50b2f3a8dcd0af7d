use crate::model::{
    AttendanceRecord, Course, Enrollment, Payment, Professor, Section, SectionStatusEvent,
    Student, StudentStatusEvent,
};
use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use uuid::Uuid;

/// Collection names. The keys keep the camelCase spelling the browser app
/// used, so existing exports stay readable by eye.
pub mod names {
    pub const COURSES: &str = "courses";
    pub const SECTIONS: &str = "sections";
    pub const STUDENTS: &str = "students";
    pub const PROFESSORS: &str = "professors";
    pub const ENROLLMENTS: &str = "enrollments";
    pub const ATTENDANCE: &str = "attendance";
    pub const PAYMENTS: &str = "payments";
    pub const STUDENT_STATUS_HISTORY: &str = "studentStatusHistory";
    pub const SECTION_STUDENT_STATUS_HISTORY: &str = "sectionStudentStatusHistory";

    pub const ALL: [&str; 9] = [
        COURSES,
        SECTIONS,
        STUDENTS,
        PROFESSORS,
        ENROLLMENTS,
        ATTENDANCE,
        PAYMENTS,
        STUDENT_STATUS_HISTORY,
        SECTION_STUDENT_STATUS_HISTORY,
    ];
}

/// Whole-collection get/set over a namespaced key-value store: one JSON
/// array per entity collection, written atomically per collection. The
/// engine is written against this seam so tests can run on a plain map.
pub trait CollectionStore {
    /// Read a collection; a missing key reads as an empty array.
    fn read(&self, name: &str) -> anyhow::Result<serde_json::Value>;
    fn write(&self, name: &str, data: &serde_json::Value) -> anyhow::Result<()>;
    fn contains(&self, name: &str) -> anyhow::Result<bool>;

    fn load<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<Vec<T>>
    where
        Self: Sized,
    {
        let value = self.read(name)?;
        serde_json::from_value(value).with_context(|| format!("decode collection {name}"))
    }

    fn save<T: Serialize>(&self, name: &str, rows: &[T]) -> anyhow::Result<()>
    where
        Self: Sized,
    {
        self.write(name, &serde_json::to_value(rows)?)
    }
}

/// Production store: a single `collections` table in a workspace-local
/// sqlite file, one row per collection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(workspace)?;
        let db_path = workspace.join("academy.sqlite3");
        let conn = Connection::open(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS collections(
                name TEXT PRIMARY KEY,
                data TEXT NOT NULL
            )",
            [],
        )?;
        let store = Self { conn };
        initialize(&store)?;
        Ok(store)
    }
}

impl CollectionStore for SqliteStore {
    fn read(&self, name: &str) -> anyhow::Result<serde_json::Value> {
        let raw: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM collections WHERE name = ?",
                [name],
                |r| r.get(0),
            )
            .optional()?;
        match raw {
            Some(text) => {
                serde_json::from_str(&text).with_context(|| format!("parse collection {name}"))
            }
            None => Ok(json!([])),
        }
    }

    fn write(&self, name: &str, data: &serde_json::Value) -> anyhow::Result<()> {
        self.conn.execute(
            "INSERT INTO collections(name, data) VALUES(?, ?)
             ON CONFLICT(name) DO UPDATE SET data = excluded.data",
            (name, serde_json::to_string(data)?),
        )?;
        Ok(())
    }

    fn contains(&self, name: &str) -> anyhow::Result<bool> {
        let row: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM collections WHERE name = ?", [name], |r| {
                r.get(0)
            })
            .optional()?;
        Ok(row.is_some())
    }
}

/// In-memory store for engine tests; same contract, no disk.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    data: std::cell::RefCell<std::collections::HashMap<String, serde_json::Value>>,
}

#[cfg(test)]
impl CollectionStore for MemoryStore {
    fn read(&self, name: &str) -> anyhow::Result<serde_json::Value> {
        Ok(self
            .data
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_else(|| json!([])))
    }

    fn write(&self, name: &str, data: &serde_json::Value) -> anyhow::Result<()> {
        self.data.borrow_mut().insert(name.to_string(), data.clone());
        Ok(())
    }

    fn contains(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.data.borrow().contains_key(name))
    }
}

/// One-time initialization: seed the three starter collections when the
/// store holds nothing at all, then make sure every collection exists as
/// at least an empty array. No schema versioning, no migrations.
pub fn initialize<S: CollectionStore>(store: &S) -> anyhow::Result<bool> {
    let mut any_present = false;
    for name in names::ALL {
        if store.contains(name)? {
            any_present = true;
            break;
        }
    }

    let seeded = if any_present {
        false
    } else {
        store.save(names::COURSES, &starter_courses())?;
        store.save(names::PROFESSORS, &starter_professors())?;
        store.save(names::STUDENTS, &starter_students())?;
        tracing::info!("seeded starter courses, professors and students");
        true
    };

    for name in names::ALL {
        if !store.contains(name)? {
            store.write(name, &json!([]))?;
        }
    }
    Ok(seeded)
}

fn starter_courses() -> Vec<Course> {
    [
        ("General English", "Core language program, all levels"),
        ("Mathematics", "Arithmetic through pre-calculus"),
        ("Music Theory", "Reading, harmony and ear training"),
    ]
    .into_iter()
    .map(|(name, description)| Course {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        description: description.to_string(),
    })
    .collect()
}

fn starter_professors() -> Vec<Professor> {
    ["Alicia Romero", "Daniel Obuya"]
        .into_iter()
        .map(|name| Professor {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: String::new(),
            phone: String::new(),
        })
        .collect()
}

fn starter_students() -> Vec<Student> {
    ["Marta Vidal", "Leo Tanaka", "Ines Ferreira"]
        .into_iter()
        .map(|name| Student {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: String::new(),
            phone: String::new(),
            birth_date: None,
            sex: None,
        })
        .collect()
}

/// In-memory view of every persisted collection. Operations read a
/// snapshot, mutate a copy and write whole collections back; there is no
/// row-level write path.
pub struct Snapshot {
    pub courses: Vec<Course>,
    pub sections: Vec<Section>,
    pub students: Vec<Student>,
    pub professors: Vec<Professor>,
    pub enrollments: Vec<Enrollment>,
    pub attendance: Vec<AttendanceRecord>,
    pub payments: Vec<Payment>,
    pub student_status_history: Vec<StudentStatusEvent>,
    pub section_student_status_history: Vec<SectionStatusEvent>,
}

impl Snapshot {
    pub fn load<S: CollectionStore>(store: &S) -> anyhow::Result<Self> {
        Ok(Self {
            courses: store.load(names::COURSES)?,
            sections: store.load(names::SECTIONS)?,
            students: store.load(names::STUDENTS)?,
            professors: store.load(names::PROFESSORS)?,
            enrollments: store.load(names::ENROLLMENTS)?,
            attendance: store.load(names::ATTENDANCE)?,
            payments: store.load(names::PAYMENTS)?,
            student_status_history: store.load(names::STUDENT_STATUS_HISTORY)?,
            section_student_status_history: store.load(names::SECTION_STUDENT_STATUS_HISTORY)?,
        })
    }
}
