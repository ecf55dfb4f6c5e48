use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Student;

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct StudentCreate {
    #[serde(default, alias = "profileId")]
    pub(crate) profile_id: Option<String>,
    #[serde(alias = "enrollmentNumber")]
    #[validate(length(min = 1, message = "enrollment_number must not be empty"))]
    pub(crate) enrollment_number: String,
    #[serde(alias = "studentName", alias = "name")]
    #[validate(length(min = 1, message = "student_name must not be empty"))]
    pub(crate) student_name: String,
    #[serde(alias = "studentEmail", alias = "email")]
    #[validate(email(message = "student_email must be a valid address"))]
    pub(crate) student_email: String,
    #[serde(default, alias = "studentPhone", alias = "phone")]
    pub(crate) student_phone: String,
    #[serde(default)]
    pub(crate) course: String,
    #[serde(default)]
    pub(crate) branch: String,
    #[serde(default, alias = "yearOfStudy")]
    #[validate(range(min = 1, max = 6, message = "year_of_study must be between 1 and 6"))]
    pub(crate) year_of_study: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 10.0, message = "cgpa must be between 0 and 10"))]
    pub(crate) cgpa: Option<f64>,
    #[serde(default)]
    pub(crate) skills: Vec<String>,
    #[serde(default, alias = "placementStatus")]
    pub(crate) placement_status: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct StudentUpdate {
    #[serde(default, alias = "studentName", alias = "name")]
    #[validate(length(min = 1, message = "student_name must not be empty"))]
    pub(crate) student_name: Option<String>,
    #[serde(default, alias = "studentEmail", alias = "email")]
    #[validate(email(message = "student_email must be a valid address"))]
    pub(crate) student_email: Option<String>,
    #[serde(default, alias = "studentPhone", alias = "phone")]
    pub(crate) student_phone: Option<String>,
    #[serde(default)]
    pub(crate) course: Option<String>,
    #[serde(default)]
    pub(crate) branch: Option<String>,
    #[serde(default, alias = "yearOfStudy")]
    #[validate(range(min = 1, max = 6, message = "year_of_study must be between 1 and 6"))]
    pub(crate) year_of_study: Option<i32>,
    #[serde(default)]
    #[validate(range(min = 0.0, max = 10.0, message = "cgpa must be between 0 and 10"))]
    pub(crate) cgpa: Option<f64>,
    #[serde(default)]
    pub(crate) skills: Option<Vec<String>>,
    #[serde(default, alias = "placementStatus")]
    pub(crate) placement_status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StudentListQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) course: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentResponse {
    pub(crate) id: String,
    pub(crate) profile_id: Option<String>,
    pub(crate) enrollment_number: String,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) student_phone: String,
    pub(crate) course: String,
    pub(crate) branch: String,
    pub(crate) year_of_study: Option<i32>,
    pub(crate) cgpa: Option<f64>,
    pub(crate) skills: Vec<String>,
    pub(crate) placement_status: Option<String>,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl StudentResponse {
    pub(crate) fn from_db(student: Student) -> Self {
        Self {
            id: student.id,
            profile_id: student.profile_id,
            enrollment_number: student.enrollment_number,
            student_name: student.student_name,
            student_email: student.student_email,
            student_phone: student.student_phone,
            course: student.course,
            branch: student.branch,
            year_of_study: student.year_of_study,
            cgpa: student.cgpa,
            skills: student.skills.0,
            placement_status: student.placement_status,
            created_at: format_primitive(student.created_at),
            updated_at: format_primitive(student.updated_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ImportResponse {
    pub(crate) imported: usize,
    /// Enrollment numbers already present.
    pub(crate) skipped: usize,
    /// Rows missing an enrollment number, name or email.
    pub(crate) invalid_rows: usize,
}
