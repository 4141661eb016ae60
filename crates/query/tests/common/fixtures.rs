//! Test fixtures for query engine testing.
//!
//! Provides a small university data set: students reference an academic
//! department, and departments reference an academic faculty.

#![allow(dead_code)]

use serde_json::{Value, json};

use helios_query::MemoryStore;

pub const STUDENTS: &str = "students";
pub const DEPARTMENTS: &str = "departments";
pub const FACULTIES: &str = "faculties";

/// A student fixture for testing.
#[derive(Debug, Clone)]
pub struct StudentFixture {
    /// Student ID.
    pub id: String,
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Email address.
    pub email: String,
    /// Age in years.
    pub age: u32,
    /// Gender.
    pub gender: String,
    /// Referenced department ID.
    pub department: Option<String>,
    /// Creation timestamp (epoch seconds).
    pub created_at: u64,
}

impl StudentFixture {
    /// Creates a student with derived email and defaults for everything else.
    pub fn new(id: impl Into<String>, first_name: impl Into<String>, created_at: u64) -> Self {
        let first_name = first_name.into();
        Self {
            id: id.into(),
            email: format!("{}@university.edu", first_name.to_lowercase()),
            first_name,
            last_name: "Doe".to_string(),
            age: 20,
            gender: "male".to_string(),
            department: None,
            created_at,
        }
    }

    /// Sets the family name.
    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = last_name.into();
        self
    }

    /// Sets the age.
    pub fn with_age(mut self, age: u32) -> Self {
        self.age = age;
        self
    }

    /// Sets the gender.
    pub fn with_gender(mut self, gender: impl Into<String>) -> Self {
        self.gender = gender.into();
        self
    }

    /// Sets the department reference.
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    /// Builds the stored document.
    pub fn build(&self) -> Value {
        let mut doc = json!({
            "_id": self.id,
            "name": {"firstName": self.first_name, "lastName": self.last_name},
            "email": self.email,
            "age": self.age,
            "gender": self.gender,
            "presentAddress": format!("{} Main Street", self.created_at),
            "createdAt": self.created_at,
            "__version": 0
        });
        if let Some(department) = &self.department {
            doc["academicDepartment"] = json!(department);
        }
        doc
    }
}

/// Returns the standard student roster, oldest first.
pub fn students() -> Vec<StudentFixture> {
    vec![
        StudentFixture::new("s1", "John", 1)
            .with_age(23)
            .with_department("d1"),
        StudentFixture::new("s2", "Johnny", 2)
            .with_last_name("Smith")
            .with_age(21)
            .with_department("d2"),
        StudentFixture::new("s3", "Alice", 3)
            .with_gender("female")
            .with_age(23)
            .with_department("d1"),
        StudentFixture::new("s4", "Bob", 4).with_age(22),
        StudentFixture::new("s5", "Carol", 5)
            .with_gender("female")
            .with_age(24)
            .with_department("d2"),
        StudentFixture::new("s6", "Dave", 6).with_age(23),
        StudentFixture::new("s7", "Eve", 7)
            .with_gender("female")
            .with_age(20)
            .with_department("missing"),
    ]
}

/// Creates a store seeded with students, departments and faculties.
pub fn seeded_store() -> MemoryStore {
    let store = MemoryStore::new();

    store.insert_many(STUDENTS, students().iter().map(StudentFixture::build));
    store.insert_many(
        DEPARTMENTS,
        [
            json!({"_id": "d1", "name": "Computer Science", "code": "CSE", "academicFaculty": "f1"}),
            json!({"_id": "d2", "name": "Physics", "code": "PHY", "academicFaculty": "f2"}),
        ],
    );
    store.insert_many(
        FACULTIES,
        [
            json!({"_id": "f1", "name": "Engineering"}),
            json!({"_id": "f2", "name": "Science"}),
        ],
    );

    store.relate("academicDepartment", DEPARTMENTS);
    store.relate("academicFaculty", FACULTIES);
    store
}
