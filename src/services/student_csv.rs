use csv::{QuoteStyle, ReaderBuilder, Trim, WriterBuilder};
use thiserror::Error;

use crate::core::time::format_date;
use crate::db::models::Student;

pub(crate) const EXPORT_FILENAME: &str = "students.csv";

const EXPORT_HEADER: [&str; 7] =
    ["Name", "Enrollment Number", "Email", "Phone", "Course", "Branch", "Registered"];

pub(crate) const REQUIRED_IMPORT_HEADERS: [&str; 6] =
    ["enrollment number", "name", "email", "phone", "course", "branch"];

#[derive(Debug, Error)]
pub(crate) enum CsvImportError {
    #[error("CSV must have a header and at least one row.")]
    Empty,
    #[error("CSV must include headers: {}", REQUIRED_IMPORT_HEADERS.join(", "))]
    MissingHeaders,
    #[error("No valid students found in CSV.")]
    NoValidRows,
    #[error("malformed CSV: {0}")]
    Malformed(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportedStudent {
    pub(crate) enrollment_number: String,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) student_phone: String,
    pub(crate) course: String,
    pub(crate) branch: String,
}

#[derive(Debug)]
pub(crate) struct ParsedImport {
    pub(crate) students: Vec<ImportedStudent>,
    /// Rows dropped for lacking an enrollment number, name or email.
    pub(crate) invalid_rows: usize,
}

/// Every field quoted, registration date as `YYYY-MM-DD`.
pub(crate) fn export(students: &[Student]) -> Result<String, csv::Error> {
    let mut writer = WriterBuilder::new().quote_style(QuoteStyle::Always).from_writer(Vec::new());

    writer.write_record(EXPORT_HEADER)?;
    for student in students {
        writer.write_record([
            student.student_name.as_str(),
            student.enrollment_number.as_str(),
            student.student_email.as_str(),
            student.student_phone.as_str(),
            student.course.as_str(),
            student.branch.as_str(),
            format_date(student.created_at).as_str(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|err| csv::Error::from(err.into_error()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Header names are matched case-insensitively; extra columns are ignored.
pub(crate) fn parse_import(data: &[u8]) -> Result<ParsedImport, CsvImportError> {
    let mut reader =
        ReaderBuilder::new().flexible(true).trim(Trim::All).has_headers(true).from_reader(data);

    let headers: Vec<String> =
        reader.headers()?.iter().map(|header| header.trim().to_lowercase()).collect();
    if headers.iter().all(String::is_empty) {
        return Err(CsvImportError::Empty);
    }

    let position = |name: &str| headers.iter().position(|header| header == name);
    let columns = REQUIRED_IMPORT_HEADERS
        .into_iter()
        .map(position)
        .collect::<Option<Vec<usize>>>()
        .ok_or(CsvImportError::MissingHeaders)?;
    let [enrollment, name, email, phone, course, branch] = columns[..] else {
        return Err(CsvImportError::MissingHeaders);
    };

    let mut students = Vec::new();
    let mut invalid_rows = 0;
    let mut total_rows = 0;

    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        total_rows += 1;

        let field = |index: usize| record.get(index).unwrap_or_default().to_string();
        let student = ImportedStudent {
            enrollment_number: field(enrollment),
            student_name: field(name),
            student_email: field(email),
            student_phone: field(phone),
            course: field(course),
            branch: field(branch),
        };

        if student.enrollment_number.is_empty()
            || student.student_name.is_empty()
            || student.student_email.is_empty()
        {
            invalid_rows += 1;
            continue;
        }
        students.push(student);
    }

    if total_rows == 0 {
        return Err(CsvImportError::Empty);
    }
    if students.is_empty() {
        return Err(CsvImportError::NoValidRows);
    }

    Ok(ParsedImport { students, invalid_rows })
}
