use std::collections::HashSet;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::{Duration, PrimitiveDateTime};
use uuid::Uuid;

use crate::core::time::format_primitive;
use crate::db::models::{AnswerMap, TestQuestion, TestSettings, ViolationRecord};
use crate::db::types::{
    DifficultyLevel, OrganizationType, ProctoringLevel, QuestionType, ResultStatus, SessionStatus,
    UserRole, ViolationSeverity,
};
use crate::services::proctoring::{seeded_event_severity, SEEDED_EVENT_TYPES};
use crate::services::scoring;
use crate::services::table_api::{Filter, TableStore};

pub(crate) const PROFILE_CHUNK: usize = 20;
pub(crate) const STUDENT_CHUNK: usize = 25;
pub(crate) const QUESTION_CHUNK: usize = 25;
pub(crate) const RESPONSE_CHUNK: usize = 50;
pub(crate) const EVENT_CHUNK: usize = 30;

const COMPANY_COUNT: usize = 8;
const INSTITUTION_COUNT: usize = 3;
const RECRUITER_COUNT: usize = 8;
const STUDENT_COUNT: usize = 100;
const QUESTION_COUNT: usize = 200;
const TEST_COUNT: usize = 20;
const SESSION_COUNT: usize = 50;
const RESULT_LIMIT: usize = 25;

const COMPANY_NAMES: [&str; 10] = [
    "TechCorp Solutions",
    "InnovateHub",
    "DataSphere Inc",
    "CloudVantage",
    "CodeForge Technologies",
    "Digital Dynamics",
    "SmartSystems",
    "FutureTech Labs",
    "Quantum Solutions",
    "Nexus Enterprises",
];
const INSTITUTION_NAMES: [&str; 5] = [
    "State University",
    "Tech Institute",
    "Engineering College",
    "Science Academy",
    "Professional University",
];
const CITIES: [&str; 6] = ["Mumbai", "Delhi", "Bangalore", "Hyderabad", "Chennai", "Pune"];
const STATES: [&str; 5] = ["Maharashtra", "Delhi", "Karnataka", "Telangana", "Tamil Nadu"];
const COURSES: [&str; 6] = ["B.Tech", "B.E.", "MCA", "M.Tech", "BCA", "B.Sc"];
const BRANCHES: [&str; 6] = [
    "Computer Science",
    "Information Technology",
    "Electronics",
    "Mechanical",
    "Civil",
    "Electrical",
];
const BRANCH_CODES: [&str; 6] = ["CS", "IT", "EC", "ME", "CE", "EE"];
const FIRST_NAMES: [&str; 10] =
    ["Raj", "Priya", "Amit", "Sneha", "Rahul", "Anjali", "Vikram", "Kavya", "Arjun", "Divya"];
const LAST_NAMES: [&str; 10] =
    ["Sharma", "Patel", "Kumar", "Singh", "Gupta", "Reddy", "Mehta", "Verma", "Jain", "Agarwal"];
const EMAIL_DOMAINS: [&str; 4] = ["gmail.com", "yahoo.com", "university.edu", "student.edu"];
const TOPICS: [&str; 15] = [
    "Data Structures",
    "Algorithms",
    "Database Management",
    "Operating Systems",
    "Computer Networks",
    "Software Engineering",
    "Web Development",
    "Machine Learning",
    "Cybersecurity",
    "Cloud Computing",
    "Object-Oriented Programming",
    "System Design",
    "Mobile Development",
    "DevOps",
    "Blockchain",
];
const SUBJECTS: [&str; 6] = [
    "Computer Science",
    "Mathematics",
    "Programming",
    "Database",
    "Networking",
    "Software Engineering",
];
const SKILL_GROUPS: [&[&str]; 3] = [
    &["Java", "Python", "JavaScript", "C++", "React", "Node.js", "SQL", "MongoDB"],
    &["Data Structures", "Algorithms", "Web Development", "Mobile Development"],
    &["Machine Learning", "Cloud Computing", "DevOps", "Cybersecurity"],
];
const PLACEMENT_STATUSES: [&str; 3] = ["available", "placed", "not_interested"];
const TEST_KINDS: [&str; 3] = ["placement", "assessment", "certification"];
const QUESTION_TYPES: [QuestionType; 4] = [
    QuestionType::Mcq,
    QuestionType::MultipleSelect,
    QuestionType::Subjective,
    QuestionType::Coding,
];
const DIFFICULTIES: [DifficultyLevel; 3] =
    [DifficultyLevel::Easy, DifficultyLevel::Medium, DifficultyLevel::Hard];
const SESSION_STATUSES: [SessionStatus; 4] = [
    SessionStatus::InProgress,
    SessionStatus::Completed,
    SessionStatus::Terminated,
    SessionStatus::Expired,
];
const TERMINATION_REASONS: [&str; 3] =
    ["Multiple violations", "Suspicious activity", "Time exceeded"];
const RESULT_VIOLATION_TYPES: [&str; 3] = ["face_not_detected", "tab_switch", "suspicious_movement"];

#[derive(Debug, Clone, Serialize)]
pub(crate) struct OrganizationSeed {
    pub(crate) id: String,
    pub(crate) name: String,
    #[serde(rename = "type")]
    pub(crate) org_type: OrganizationType,
    pub(crate) domain: String,
    pub(crate) contact_email: String,
    pub(crate) contact_phone: String,
    pub(crate) address: Value,
    pub(crate) is_active: bool,
    pub(crate) settings: Value,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ProfileSeed {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) organization_id: Option<String>,
    pub(crate) phone: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) preferences: Value,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StudentSeed {
    pub(crate) id: String,
    pub(crate) profile_id: String,
    pub(crate) enrollment_number: String,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) student_phone: String,
    pub(crate) course: String,
    pub(crate) branch: String,
    pub(crate) year_of_study: i32,
    pub(crate) cgpa: f64,
    pub(crate) skills: Vec<String>,
    pub(crate) placement_status: String,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionSeed {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer: Option<Value>,
    pub(crate) marks: f64,
    pub(crate) negative_marks: f64,
    pub(crate) difficulty_level: DifficultyLevel,
    pub(crate) topic: String,
    pub(crate) subject: String,
    pub(crate) tags: Vec<String>,
    pub(crate) created_by: String,
    pub(crate) organization_id: String,
    pub(crate) is_active: bool,
}

impl QuestionSeed {
    fn frozen(&self) -> TestQuestion {
        TestQuestion {
            id: self.id.clone(),
            question_text: self.question_text.clone(),
            question_type: self.question_type,
            options: self.options.clone(),
            correct_answer: self.correct_answer.clone(),
            marks: self.marks,
            negative_marks: self.negative_marks,
            difficulty_level: self.difficulty_level,
            topic: self.topic.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TestSeed {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) company_name: String,
    pub(crate) organization_id: String,
    pub(crate) created_by: String,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: f64,
    pub(crate) passing_marks: f64,
    pub(crate) questions: Vec<TestQuestion>,
    pub(crate) settings: TestSettings,
    pub(crate) is_active: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SessionSeed {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) status: SessionStatus,
    pub(crate) start_time: String,
    pub(crate) end_time: Option<String>,
    pub(crate) expires_at: String,
    pub(crate) browser_info: Value,
    pub(crate) device_info: Value,
    pub(crate) ip_address: String,
    pub(crate) violation_count: i32,
    pub(crate) is_flagged: bool,
    pub(crate) termination_reason: Option<String>,
    #[serde(skip)]
    start: PrimitiveDateTime,
    #[serde(skip)]
    end: Option<PrimitiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResponseSeed {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) question_id: String,
    pub(crate) response_data: Value,
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_awarded: f64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResultSeed {
    pub(crate) id: String,
    pub(crate) exam_session_id: String,
    pub(crate) student_id: String,
    pub(crate) test_id: String,
    pub(crate) score: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) time_taken: i32,
    pub(crate) status: ResultStatus,
    pub(crate) violations: Vec<ViolationRecord>,
    pub(crate) questions: Vec<TestQuestion>,
    pub(crate) answers: AnswerMap,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct EventSeed {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) event_type: String,
    pub(crate) severity: ViolationSeverity,
    pub(crate) confidence_score: f64,
    pub(crate) description: String,
    pub(crate) occurred_at: String,
}

/// Everything one seeding run inserts, generated up front with client-side
/// ids so later tables can reference earlier ones.
#[derive(Debug, Clone)]
pub(crate) struct SeedData {
    pub(crate) organizations: Vec<OrganizationSeed>,
    pub(crate) profiles: Vec<ProfileSeed>,
    pub(crate) students: Vec<StudentSeed>,
    pub(crate) questions: Vec<QuestionSeed>,
    pub(crate) tests: Vec<TestSeed>,
    pub(crate) sessions: Vec<SessionSeed>,
    pub(crate) responses: Vec<ResponseSeed>,
    pub(crate) results: Vec<ResultSeed>,
    pub(crate) events: Vec<EventSeed>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SeedSummary {
    pub(crate) organizations: usize,
    pub(crate) profiles: usize,
    pub(crate) students: usize,
    pub(crate) questions: usize,
    pub(crate) tests: usize,
    pub(crate) sessions: usize,
    pub(crate) responses: usize,
    pub(crate) results: usize,
    pub(crate) events: usize,
}

impl SeedSummary {
    pub(crate) fn planned(data: &SeedData) -> Self {
        Self {
            organizations: data.organizations.len(),
            profiles: data.profiles.len(),
            students: data.students.len(),
            questions: data.questions.len(),
            tests: data.tests.len(),
            sessions: data.sessions.len(),
            responses: data.responses.len(),
            results: data.results.len(),
            events: data.events.len(),
        }
    }

    pub(crate) fn lines(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("Organizations", self.organizations),
            ("Profiles", self.profiles),
            ("Students", self.students),
            ("Questions", self.questions),
            ("Tests", self.tests),
            ("Exam Sessions", self.sessions),
            ("Exam Responses", self.responses),
            ("Results", self.results),
            ("Proctoring Events", self.events),
        ]
    }
}

/// What happens when one chunk of a table is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BatchFailure {
    Abort,
    Skip,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn pick<'a, R: Rng + ?Sized, T>(rng: &mut R, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

fn money<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    (rng.gen_range(min..max) * 100.0).round() / 100.0
}

fn slug(name: &str) -> String {
    name.to_lowercase().split_whitespace().collect()
}

fn phone<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("+91{}", rng.gen_range(7_000_000_000_u64..=9_999_999_999))
}

fn email<R: Rng + ?Sized>(rng: &mut R, name: &str) -> String {
    let local = name.to_lowercase().split_whitespace().collect::<Vec<_>>().join(".");
    format!("{local}{}@{}", rng.gen_range(100..=999), pick(rng, &EMAIL_DOMAINS))
}

fn person<R: Rng + ?Sized>(rng: &mut R) -> String {
    format!("{} {}", pick(rng, &FIRST_NAMES), pick(rng, &LAST_NAMES))
}

fn between<R: Rng + ?Sized>(
    rng: &mut R,
    start: PrimitiveDateTime,
    end: PrimitiveDateTime,
) -> PrimitiveDateTime {
    let span = (end - start).whole_seconds().max(0);
    start + Duration::seconds(rng.gen_range(0..=span))
}

fn address<R: Rng + ?Sized>(rng: &mut R, street: &str) -> Value {
    json!({
        "street": format!("{} {street}", rng.gen_range(1..=999)),
        "city": pick(rng, &CITIES),
        "state": pick(rng, &STATES),
        "zip": rng.gen_range(100_000..=999_999),
        "country": "India",
    })
}

pub(crate) fn generate_organizations<R: Rng + ?Sized>(rng: &mut R) -> Vec<OrganizationSeed> {
    let mut organizations = Vec::with_capacity(COMPANY_COUNT + INSTITUTION_COUNT);

    for name in COMPANY_NAMES.iter().take(COMPANY_COUNT) {
        let domain = format!("{}.com", slug(name));
        organizations.push(OrganizationSeed {
            id: new_id(),
            name: (*name).to_string(),
            org_type: OrganizationType::Company,
            contact_email: format!("contact@{domain}"),
            domain,
            contact_phone: phone(rng),
            address: address(rng, "Main Street"),
            is_active: true,
            settings: json!({}),
        });
    }

    for name in INSTITUTION_NAMES.iter().take(INSTITUTION_COUNT) {
        let domain = format!("{}.edu", slug(name));
        let prefix = pick(rng, &["State", "National", "Premier"]);
        organizations.push(OrganizationSeed {
            id: new_id(),
            name: format!("{prefix} {name}"),
            org_type: OrganizationType::Institution,
            contact_email: format!("admin@{domain}"),
            domain,
            contact_phone: phone(rng),
            address: address(rng, "Education Avenue"),
            is_active: true,
            settings: json!({}),
        });
    }

    organizations
}

fn org_ids(organizations: &[OrganizationSeed], org_type: OrganizationType) -> Vec<String> {
    organizations
        .iter()
        .filter(|organization| organization.org_type == org_type)
        .map(|organization| organization.id.clone())
        .collect()
}

pub(crate) fn generate_profiles<R: Rng + ?Sized>(
    rng: &mut R,
    organizations: &[OrganizationSeed],
) -> Vec<ProfileSeed> {
    let companies = org_ids(organizations, OrganizationType::Company);
    let institutions = org_ids(organizations, OrganizationType::Institution);
    let mut profiles = Vec::with_capacity(2 + RECRUITER_COUNT + STUDENT_COUNT);

    profiles.push(ProfileSeed {
        id: new_id(),
        email: "superadmin@intellihire.com".to_string(),
        full_name: "Super Admin".to_string(),
        role: UserRole::SuperAdmin,
        organization_id: None,
        phone: None,
        is_active: true,
        preferences: json!({}),
    });
    profiles.push(ProfileSeed {
        id: new_id(),
        email: "admin@intellihire.com".to_string(),
        full_name: "System Admin".to_string(),
        role: UserRole::Admin,
        organization_id: institutions.first().cloned(),
        phone: None,
        is_active: true,
        preferences: json!({}),
    });

    let mut emails = HashSet::new();
    let mut unique_email = |rng: &mut R, name: &str| loop {
        let candidate = email(rng, name);
        if emails.insert(candidate.clone()) {
            break candidate;
        }
    };

    for index in 0..RECRUITER_COUNT {
        let name = person(rng);
        profiles.push(ProfileSeed {
            id: new_id(),
            email: unique_email(rng, &name),
            full_name: name,
            role: UserRole::Recruiter,
            organization_id: (!companies.is_empty())
                .then(|| companies[index % companies.len()].clone()),
            phone: Some(phone(rng)),
            is_active: true,
            preferences: json!({}),
        });
    }

    for index in 0..STUDENT_COUNT {
        let name = person(rng);
        profiles.push(ProfileSeed {
            id: new_id(),
            email: unique_email(rng, &name),
            full_name: name,
            role: UserRole::Student,
            organization_id: (!institutions.is_empty())
                .then(|| institutions[(index / 20) % institutions.len()].clone()),
            phone: Some(phone(rng)),
            is_active: true,
            preferences: json!({}),
        });
    }

    profiles
}

pub(crate) fn generate_students<R: Rng + ?Sized>(
    rng: &mut R,
    profiles: &[ProfileSeed],
) -> Vec<StudentSeed> {
    profiles
        .iter()
        .filter(|profile| profile.role == UserRole::Student)
        .enumerate()
        .map(|(index, profile)| {
            let skill_count = rng.gen_range(2..=3);
            let skills = SKILL_GROUPS
                .iter()
                .take(skill_count)
                .map(|group| (*pick(rng, group)).to_string())
                .collect();
            StudentSeed {
                id: new_id(),
                profile_id: profile.id.clone(),
                // Sequence suffix keeps enrollment numbers unique.
                enrollment_number: format!(
                    "{}{}{:04}",
                    rng.gen_range(2020..=2024),
                    pick(rng, &BRANCH_CODES),
                    index + 1
                ),
                student_name: profile.full_name.clone(),
                student_email: profile.email.clone(),
                student_phone: profile.phone.clone().unwrap_or_else(|| phone(rng)),
                course: (*pick(rng, &COURSES)).to_string(),
                branch: (*pick(rng, &BRANCHES)).to_string(),
                year_of_study: rng.gen_range(1..=4),
                cgpa: money(rng, 6.0, 9.5),
                skills,
                placement_status: (*pick(rng, &PLACEMENT_STATUSES)).to_string(),
            }
        })
        .collect()
}

fn authors(profiles: &[ProfileSeed]) -> Vec<String> {
    profiles
        .iter()
        .filter(|profile| matches!(profile.role, UserRole::Recruiter | UserRole::Admin))
        .map(|profile| profile.id.clone())
        .collect()
}

pub(crate) fn generate_questions<R: Rng + ?Sized>(
    rng: &mut R,
    profiles: &[ProfileSeed],
    organizations: &[OrganizationSeed],
) -> Vec<QuestionSeed> {
    let authors = authors(profiles);
    let companies = org_ids(organizations, OrganizationType::Company);
    if authors.is_empty() || companies.is_empty() {
        return Vec::new();
    }

    (0..QUESTION_COUNT)
        .map(|index| {
            let question_type = *pick(rng, &QUESTION_TYPES);
            let difficulty = *pick(rng, &DIFFICULTIES);
            let topic = (*pick(rng, &TOPICS)).to_string();
            let subject = (*pick(rng, &SUBJECTS)).to_string();
            let tag_count = rng.gen_range(2..=3);
            let tags = [topic.clone(), subject.clone(), difficulty.as_str().to_string()]
                .into_iter()
                .take(tag_count)
                .collect();

            let (options, correct_answer) = match question_type {
                QuestionType::Mcq | QuestionType::MultipleSelect => {
                    let count = rng.gen_range(4..=6_usize);
                    let options = (0..count)
                        .map(|idx| {
                            let letter = char::from(b'A' + idx as u8);
                            format!("Option {letter}: Answer choice {}", idx + 1)
                        })
                        .collect::<Vec<_>>();
                    let answer = if question_type == QuestionType::Mcq {
                        json!(rng.gen_range(0..count))
                    } else {
                        let mut picked = vec![rng.gen_range(0..count), rng.gen_range(0..count)];
                        picked.dedup();
                        json!(picked)
                    };
                    (options, Some(answer))
                }
                QuestionType::Subjective => (
                    Vec::new(),
                    Some(json!({ "keywords": ["important", "concept", "example"], "min_length": 50 })),
                ),
                QuestionType::Coding => (Vec::new(), None),
            };

            QuestionSeed {
                id: new_id(),
                question_text: format!(
                    "Sample {} question {} about {topic}",
                    question_type.as_str(),
                    index + 1
                ),
                question_type,
                options,
                correct_answer,
                marks: f64::from(rng.gen_range(1..=5)),
                negative_marks: if question_type == QuestionType::Mcq {
                    money(rng, 0.0, 0.5)
                } else {
                    0.0
                },
                difficulty_level: difficulty,
                topic,
                subject,
                tags,
                created_by: pick(rng, &authors).clone(),
                organization_id: pick(rng, &companies).clone(),
                is_active: true,
            }
        })
        .collect()
}

pub(crate) fn generate_tests<R: Rng + ?Sized>(
    rng: &mut R,
    profiles: &[ProfileSeed],
    organizations: &[OrganizationSeed],
    questions: &[QuestionSeed],
) -> Vec<TestSeed> {
    let authors = authors(profiles);
    let companies = org_ids(organizations, OrganizationType::Company);
    if authors.is_empty() || companies.is_empty() || questions.is_empty() {
        return Vec::new();
    }

    (0..TEST_COUNT)
        .map(|index| {
            let kind = *pick(rng, &TEST_KINDS);
            let difficulty = *pick(rng, &DIFFICULTIES);
            let wanted = rng.gen_range(10..=30);
            let selected = questions
                .iter()
                .filter(|question| question.difficulty_level == difficulty || rng.gen_bool(0.5))
                .take(wanted)
                .map(QuestionSeed::frozen)
                .collect::<Vec<_>>();
            let total_marks: f64 = selected.iter().map(|question| question.marks).sum();

            let mut title_kind = kind.to_string();
            if let Some(first) = title_kind.get_mut(0..1) {
                first.make_ascii_uppercase();
            }

            TestSeed {
                id: new_id(),
                title: format!("{title_kind} Test {}: {} Assessment", index + 1, pick(rng, &TOPICS)),
                description: format!(
                    "Comprehensive {kind} test covering {} and related concepts. This test \
                     evaluates your knowledge and problem-solving skills.",
                    pick(rng, &TOPICS)
                ),
                company_name: (*pick(rng, &COMPANY_NAMES)).to_string(),
                organization_id: pick(rng, &companies).clone(),
                created_by: pick(rng, &authors).clone(),
                duration_minutes: rng.gen_range(30..=120),
                total_marks,
                passing_marks: (total_marks * 0.4).floor(),
                questions: selected,
                settings: TestSettings {
                    proctoring_level: *pick(
                        rng,
                        &[ProctoringLevel::Strict, ProctoringLevel::Moderate, ProctoringLevel::Off],
                    ),
                    shuffle_questions: true,
                    negative_marking: rng.gen_bool(0.5),
                    allow_tab_switch: false,
                    max_violations: Some(rng.gen_range(3..=7)),
                },
                is_active: rng.gen_bool(0.8),
            }
        })
        .collect()
}

pub(crate) fn generate_sessions<R: Rng + ?Sized>(
    rng: &mut R,
    tests: &[TestSeed],
    students: &[StudentSeed],
    now: PrimitiveDateTime,
) -> Vec<SessionSeed> {
    if tests.is_empty() || students.is_empty() {
        return Vec::new();
    }
    let earliest = now - Duration::days(365);
    let mut open_pairs = HashSet::new();
    let mut sessions = Vec::with_capacity(SESSION_COUNT);

    for _ in 0..SESSION_COUNT {
        let test = pick(rng, tests);
        let student = pick(rng, students);
        let mut status = *pick(rng, &SESSION_STATUSES);
        // At most one open session per (test, student).
        if status == SessionStatus::InProgress
            && !open_pairs.insert((test.id.clone(), student.profile_id.clone()))
        {
            status = SessionStatus::Completed;
        }

        let duration = Duration::minutes(i64::from(test.duration_minutes));
        let start = if status == SessionStatus::InProgress {
            between(rng, now - duration / 2, now)
        } else {
            between(rng, earliest, now - duration)
        };
        let end = match status {
            SessionStatus::Completed | SessionStatus::Terminated => Some(
                start + Duration::minutes(rng.gen_range(10..=i64::from(test.duration_minutes))),
            ),
            SessionStatus::Expired => Some(start + duration),
            SessionStatus::InProgress => None,
        };

        sessions.push(SessionSeed {
            id: new_id(),
            test_id: test.id.clone(),
            student_id: student.profile_id.clone(),
            status,
            start_time: format_primitive(start),
            end_time: end.map(format_primitive),
            expires_at: format_primitive(start + duration),
            browser_info: json!({
                "name": pick(rng, &["Chrome", "Firefox", "Edge", "Safari"]),
                "version": format!("{}.0.{}", rng.gen_range(100..=120), rng.gen_range(0..=9999)),
                "platform": pick(rng, &["Windows", "macOS", "Linux"]),
            }),
            device_info: json!({
                "type": pick(rng, &["desktop", "laptop"]),
                "os": pick(rng, &["Windows 11", "macOS", "Linux"]),
                "screen_resolution": pick(rng, &["1920x1080", "1366x768", "2560x1440"]),
            }),
            ip_address: format!(
                "{}.{}.{}.{}",
                rng.gen_range(1..=255),
                rng.gen_range(1..=255),
                rng.gen_range(1..=255),
                rng.gen_range(1..=255)
            ),
            violation_count: rng.gen_range(0..=5),
            is_flagged: rng.gen_bool(0.3),
            termination_reason: (status == SessionStatus::Terminated)
                .then(|| (*pick(rng, &TERMINATION_REASONS)).to_string()),
            start,
            end,
        });
    }

    sessions
}

/// A plausible answer: choice questions hit the key 70% of the time.
fn sample_answer<R: Rng + ?Sized>(rng: &mut R, question: &TestQuestion) -> Value {
    let option_count = question.options.len().max(4);
    match question.question_type {
        QuestionType::Mcq => match &question.correct_answer {
            Some(key) if rng.gen_bool(0.7) => key.clone(),
            _ => json!(rng.gen_range(0..option_count)),
        },
        QuestionType::MultipleSelect => {
            let mut picked = vec![rng.gen_range(0..4), rng.gen_range(0..4)];
            picked.sort_unstable();
            picked.dedup();
            json!(picked)
        }
        QuestionType::Subjective => json!(
            "This is a sample answer for the subjective question. It contains relevant \
             information about the topic."
        ),
        QuestionType::Coding => json!("function solution(input) {\n  return input * 2;\n}"),
    }
}

/// Responses for completed sessions plus the answer map each session
/// submitted, keyed by session index.
pub(crate) fn generate_responses<R: Rng + ?Sized>(
    rng: &mut R,
    sessions: &[SessionSeed],
    tests: &[TestSeed],
) -> (Vec<ResponseSeed>, Vec<(usize, AnswerMap)>) {
    let mut responses = Vec::new();
    let mut answered = Vec::new();

    for (index, session) in sessions.iter().enumerate() {
        if session.status != SessionStatus::Completed {
            continue;
        }
        let Some(test) = tests.iter().find(|test| test.id == session.test_id) else {
            continue;
        };
        if test.questions.is_empty() {
            continue;
        }

        let upper = test.questions.len().min(15);
        let count = rng.gen_range(upper.min(5)..=upper);
        let mut answers = AnswerMap::new();
        for question in test.questions.iter().take(count) {
            let answer = sample_answer(rng, question);
            let Some(graded) = scoring::grade_question(
                question,
                Some(&answer),
                test.settings.negative_marking,
            ) else {
                continue;
            };
            answers.insert(question.id.clone(), answer);
            responses.push(ResponseSeed {
                id: new_id(),
                session_id: session.id.clone(),
                question_id: graded.question_id,
                response_data: graded.response,
                is_correct: graded.is_correct,
                marks_awarded: graded.marks_awarded,
            });
        }
        answered.push((index, answers));
    }

    (responses, answered)
}

pub(crate) fn generate_results<R: Rng + ?Sized>(
    rng: &mut R,
    sessions: &[SessionSeed],
    tests: &[TestSeed],
    answered: &[(usize, AnswerMap)],
    now: PrimitiveDateTime,
) -> Vec<ResultSeed> {
    answered
        .iter()
        .take(RESULT_LIMIT)
        .filter_map(|(index, answers)| {
            let session = sessions.get(*index)?;
            let test = tests.iter().find(|test| test.id == session.test_id)?;
            let sheet =
                scoring::score_answers(&test.questions, answers, test.settings.negative_marking);
            let status = pass_status(test, sheet.percentage);
            let violations = (0..session.violation_count)
                .map(|_| ViolationRecord {
                    kind: (*pick(rng, &RESULT_VIOLATION_TYPES)).to_string(),
                    description: "Recorded during a seeded session".to_string(),
                    severity: *pick(
                        rng,
                        &[ViolationSeverity::Low, ViolationSeverity::Medium, ViolationSeverity::High],
                    ),
                    timestamp: format_primitive(now),
                })
                .collect();

            Some(ResultSeed {
                id: new_id(),
                exam_session_id: session.id.clone(),
                student_id: session.student_id.clone(),
                test_id: test.id.clone(),
                score: sheet.score,
                total_marks: sheet.total_marks,
                percentage: round_percentage(sheet.percentage),
                time_taken: session
                    .end
                    .map(|end| scoring::time_taken_minutes(session.start, end))
                    .unwrap_or(test.duration_minutes),
                status,
                violations,
                questions: test.questions.clone(),
                answers: answers.clone(),
            })
        })
        .collect()
}

pub(crate) fn generate_events<R: Rng + ?Sized>(
    rng: &mut R,
    sessions: &[SessionSeed],
    now: PrimitiveDateTime,
) -> Vec<EventSeed> {
    let mut events = Vec::new();

    for session in sessions.iter().filter(|session| session.is_flagged || session.violation_count > 0) {
        let count = rng.gen_range(1..=session.violation_count + 2);
        for _ in 0..count {
            let event_type = *pick(rng, &SEEDED_EVENT_TYPES);
            events.push(EventSeed {
                id: new_id(),
                session_id: session.id.clone(),
                event_type: event_type.to_string(),
                severity: seeded_event_severity(event_type),
                confidence_score: money(rng, 0.5, 1.0),
                description: format!("Proctoring event: {event_type}"),
                occurred_at: format_primitive(between(
                    rng,
                    session.start,
                    session.end.unwrap_or(now).max(session.start),
                )),
            });
        }
    }

    events
}

pub(crate) fn generate<R: Rng + ?Sized>(rng: &mut R, now: PrimitiveDateTime) -> SeedData {
    let organizations = generate_organizations(rng);
    let profiles = generate_profiles(rng, &organizations);
    let students = generate_students(rng, &profiles);
    let mut questions = generate_questions(rng, &profiles, &organizations);
    questions.shuffle(rng);
    let tests = generate_tests(rng, &profiles, &organizations, &questions);
    let sessions = generate_sessions(rng, &tests, &students, now);
    let (responses, answered) = generate_responses(rng, &sessions, &tests);
    let results = generate_results(rng, &sessions, &tests, &answered, now);
    let events = generate_events(rng, &sessions, now);

    SeedData {
        organizations,
        profiles,
        students,
        questions,
        tests,
        sessions,
        responses,
        results,
        events,
    }
}

/// Seeded results pass against the test's own passing marks.
fn pass_status(test: &TestSeed, percentage: f64) -> ResultStatus {
    if percentage >= scoring::percentage(test.passing_marks, test.total_marks) {
        ResultStatus::Pass
    } else {
        ResultStatus::Fail
    }
}

fn round_percentage(percentage: f64) -> f64 {
    (percentage * 100.0).round() / 100.0
}

/// Tables in foreign-key order; `reset` walks it backwards.
pub(crate) const SEED_TABLES: [&str; 9] = [
    "organizations",
    "profiles",
    "students",
    "questions",
    "tests",
    "exam_sessions",
    "exam_responses",
    "results",
    "proctoring_events",
];

/// Inserts `rows` in chunks of `chunk_size`. Returns how many rows the store
/// accepted.
pub(crate) async fn insert_chunked<S, T>(
    store: &S,
    table: &str,
    rows: &[T],
    chunk_size: usize,
    on_failure: BatchFailure,
) -> Result<usize>
where
    S: TableStore + ?Sized,
    T: Serialize,
{
    if rows.is_empty() {
        return Ok(0);
    }
    let chunk_size = chunk_size.max(1);
    let batches = rows.len().div_ceil(chunk_size);
    let mut inserted = 0;

    for (index, chunk) in rows.chunks(chunk_size).enumerate() {
        let batch = index + 1;
        let payload = chunk
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to encode {table} batch {batch}"))?;

        match store.insert(table, payload).await {
            Ok(echoed) => {
                inserted += echoed.len();
                tracing::info!(table, batch, batches, rows = echoed.len(), "Inserted batch");
            }
            Err(err) if on_failure == BatchFailure::Skip => {
                tracing::warn!(table, batch, batches, error = %err, "Skipping failed batch");
            }
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to seed {table} batch {batch}"));
            }
        }
    }

    Ok(inserted)
}

#[derive(Debug, Deserialize)]
pub(crate) struct StoredResponse {
    pub(crate) question_id: String,
    pub(crate) response_data: Value,
}

/// Re-scores a generated result against the responses the store actually
/// holds for its session. Skipped response batches leave those answers out.
pub(crate) fn rescore_result(
    result: &ResultSeed,
    test: &TestSeed,
    stored: Vec<StoredResponse>,
) -> ResultSeed {
    let answers: AnswerMap =
        stored.into_iter().map(|row| (row.question_id, row.response_data)).collect();
    let sheet = scoring::score_answers(&test.questions, &answers, test.settings.negative_marking);

    ResultSeed {
        score: sheet.score,
        total_marks: sheet.total_marks,
        percentage: round_percentage(sheet.percentage),
        status: pass_status(test, sheet.percentage),
        answers,
        ..result.clone()
    }
}

/// Reads back each inserted result's responses and patches results whose
/// score no longer matches. Returns how many results were patched.
pub(crate) async fn reconcile_results<S>(store: &S, data: &SeedData) -> Result<usize>
where
    S: TableStore + ?Sized,
{
    let mut patched = 0;

    for result in &data.results {
        let Some(test) = data.tests.iter().find(|test| test.id == result.test_id) else {
            continue;
        };

        let rows = match store
            .select("exam_responses", Some(Filter::eq("session_id", &result.exam_session_id)))
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                tracing::warn!(result_id = %result.id, error = %err, "Could not read back responses");
                continue;
            }
        };
        let stored = rows
            .into_iter()
            .map(serde_json::from_value::<StoredResponse>)
            .collect::<Result<Vec<_>, _>>()
            .context("Unexpected exam_responses row")?;

        let rescored = rescore_result(result, test, stored);
        if rescored.score == result.score && rescored.answers.len() == result.answers.len() {
            continue;
        }

        store
            .update(
                "results",
                Filter::eq("id", &result.id),
                json!({
                    "score": rescored.score,
                    "percentage": rescored.percentage,
                    "status": rescored.status,
                    "answers": rescored.answers,
                }),
            )
            .await
            .with_context(|| format!("Failed to reconcile result {}", result.id))?;
        patched += 1;
    }

    if patched > 0 {
        tracing::info!(patched, "Reconciled results with stored responses");
    }
    Ok(patched)
}

/// Empties every seeded table, children first.
pub(crate) async fn reset<S>(store: &S) -> Result<()>
where
    S: TableStore + ?Sized,
{
    for table in SEED_TABLES.iter().rev() {
        store
            .delete(table, Filter::not_null("id"))
            .await
            .with_context(|| format!("Failed to clear {table}"))?;
        tracing::info!(table, "Cleared table");
    }
    Ok(())
}

/// Writes `data` in foreign-key order.
pub(crate) async fn execute<S>(store: &S, data: &SeedData) -> Result<SeedSummary>
where
    S: TableStore + ?Sized,
{
    let all = |rows: usize| rows.max(1);

    let organizations = insert_chunked(
        store,
        "organizations",
        &data.organizations,
        all(data.organizations.len()),
        BatchFailure::Abort,
    )
    .await?;
    let profiles =
        insert_chunked(store, "profiles", &data.profiles, PROFILE_CHUNK, BatchFailure::Abort)
            .await?;
    let students =
        insert_chunked(store, "students", &data.students, STUDENT_CHUNK, BatchFailure::Abort)
            .await?;
    let questions =
        insert_chunked(store, "questions", &data.questions, QUESTION_CHUNK, BatchFailure::Abort)
            .await?;
    let tests =
        insert_chunked(store, "tests", &data.tests, all(data.tests.len()), BatchFailure::Abort)
            .await?;
    let sessions = insert_chunked(
        store,
        "exam_sessions",
        &data.sessions,
        all(data.sessions.len()),
        BatchFailure::Abort,
    )
    .await?;
    let responses = insert_chunked(
        store,
        "exam_responses",
        &data.responses,
        RESPONSE_CHUNK,
        BatchFailure::Skip,
    )
    .await?;
    let results = insert_chunked(
        store,
        "results",
        &data.results,
        all(data.results.len()),
        BatchFailure::Abort,
    )
    .await?;
    reconcile_results(store, data).await?;
    let events =
        insert_chunked(store, "proctoring_events", &data.events, EVENT_CHUNK, BatchFailure::Skip)
            .await?;

    Ok(SeedSummary {
        organizations,
        profiles,
        students,
        questions,
        tests,
        sessions,
        responses,
        results,
        events,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use time::macros::datetime;

    use crate::services::table_api::TableApiError;

    /// In-memory table store. `reject` lists `(table, batch)` pairs to refuse;
    /// batch `0` refuses every insert into that table.
    #[derive(Default)]
    struct MemoryStore {
        tables: Mutex<HashMap<String, Vec<Value>>>,
        batches: Mutex<HashMap<String, usize>>,
        deletes: Mutex<Vec<String>>,
        reject: Vec<(&'static str, usize)>,
    }

    impl MemoryStore {
        fn rejecting(reject: Vec<(&'static str, usize)>) -> Self {
            Self { reject, ..Self::default() }
        }

        fn rows(&self, table: &str) -> Vec<Value> {
            self.tables.lock().unwrap().get(table).cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl TableStore for MemoryStore {
        async fn select(
            &self,
            table: &str,
            filter: Option<Filter<'_>>,
        ) -> Result<Vec<Value>, TableApiError> {
            Ok(self
                .rows(table)
                .into_iter()
                .filter(|row| filter.map_or(true, |filter| filter.matches(row)))
                .collect())
        }

        async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<Vec<Value>, TableApiError> {
            let batch = {
                let mut batches = self.batches.lock().unwrap();
                let counter = batches.entry(table.to_string()).or_default();
                *counter += 1;
                *counter
            };
            if self.reject.iter().any(|(name, n)| *name == table && (*n == 0 || *n == batch)) {
                return Err(TableApiError::Status {
                    table: table.to_string(),
                    status: 409,
                    message: "duplicate key".to_string(),
                });
            }
            self.tables.lock().unwrap().entry(table.to_string()).or_default().extend(rows.clone());
            Ok(rows)
        }

        async fn update(
            &self,
            table: &str,
            filter: Filter<'_>,
            patch: Value,
        ) -> Result<Vec<Value>, TableApiError> {
            let mut tables = self.tables.lock().unwrap();
            let mut updated = Vec::new();
            for row in tables.entry(table.to_string()).or_default() {
                if !filter.matches(row) {
                    continue;
                }
                if let (Value::Object(target), Value::Object(fields)) = (&mut *row, &patch) {
                    for (key, value) in fields {
                        target.insert(key.clone(), value.clone());
                    }
                }
                updated.push(row.clone());
            }
            Ok(updated)
        }

        async fn delete(&self, table: &str, filter: Filter<'_>) -> Result<(), TableApiError> {
            self.deletes.lock().unwrap().push(table.to_string());
            if let Some(rows) = self.tables.lock().unwrap().get_mut(table) {
                rows.retain(|row| !filter.matches(row));
            }
            Ok(())
        }
    }

    fn numbered(count: usize) -> Vec<Value> {
        (0..count).map(|n| json!({ "id": format!("row-{n}") })).collect()
    }

    fn seeded() -> SeedData {
        let mut rng = StdRng::seed_from_u64(7);
        generate(&mut rng, datetime!(2025-03-01 12:00:00))
    }

    #[test]
    fn generates_the_fixed_population() {
        let data = seeded();

        assert_eq!(data.organizations.len(), 11);
        assert_eq!(data.profiles.len(), 110);
        assert_eq!(data.students.len(), 100);
        assert_eq!(data.questions.len(), 200);
        assert_eq!(data.tests.len(), 20);
        assert_eq!(data.sessions.len(), 50);
        assert!(data.results.len() <= 25);
    }

    #[test]
    fn references_point_at_generated_rows() {
        let data = seeded();
        let profile_ids: HashSet<_> = data.profiles.iter().map(|p| p.id.as_str()).collect();
        let test_ids: HashSet<_> = data.tests.iter().map(|t| t.id.as_str()).collect();
        let session_ids: HashSet<_> = data.sessions.iter().map(|s| s.id.as_str()).collect();

        assert!(data.students.iter().all(|s| profile_ids.contains(s.profile_id.as_str())));
        assert!(data.sessions.iter().all(|s| test_ids.contains(s.test_id.as_str())));
        assert!(data.sessions.iter().all(|s| profile_ids.contains(s.student_id.as_str())));
        assert!(data.responses.iter().all(|r| session_ids.contains(r.session_id.as_str())));
        assert!(data.events.iter().all(|e| session_ids.contains(e.session_id.as_str())));
    }

    #[test]
    fn enrollment_numbers_and_emails_are_unique() {
        let data = seeded();
        let enrollments: HashSet<_> =
            data.students.iter().map(|s| s.enrollment_number.as_str()).collect();
        let emails: HashSet<_> = data.profiles.iter().map(|p| p.email.as_str()).collect();

        assert_eq!(enrollments.len(), data.students.len());
        assert_eq!(emails.len(), data.profiles.len());
    }

    #[test]
    fn at_most_one_open_session_per_pair() {
        let data = seeded();
        let mut open = HashSet::new();
        for session in data.sessions.iter().filter(|s| s.status == SessionStatus::InProgress) {
            assert!(open.insert((session.test_id.as_str(), session.student_id.as_str())));
        }
    }

    #[test]
    fn responses_only_for_completed_sessions() {
        let data = seeded();
        let completed: HashSet<_> = data
            .sessions
            .iter()
            .filter(|s| s.status == SessionStatus::Completed)
            .map(|s| s.id.as_str())
            .collect();

        assert!(data.responses.iter().all(|r| completed.contains(r.session_id.as_str())));
    }

    #[test]
    fn event_severity_follows_the_table() {
        let data = seeded();
        for event in &data.events {
            assert_eq!(event.severity, seeded_event_severity(&event.event_type));
        }
    }

    #[test]
    fn seed_rows_serialize_with_store_column_names() {
        let data = seeded();
        let organization = serde_json::to_value(&data.organizations[0]).unwrap();
        let session = serde_json::to_value(&data.sessions[0]).unwrap();

        assert_eq!(organization["type"], "company");
        assert!(session.get("start").is_none());
        assert!(session["start_time"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn skipped_batches_do_not_stop_later_ones() {
        let store = MemoryStore::rejecting(vec![("exam_responses", 2)]);

        let inserted =
            insert_chunked(&store, "exam_responses", &numbered(5), 2, BatchFailure::Skip)
                .await
                .unwrap();

        assert_eq!(inserted, 3);
        let ids: Vec<_> = store.rows("exam_responses").iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![json!("row-0"), json!("row-1"), json!("row-4")]);
    }

    #[tokio::test]
    async fn aborting_batches_report_the_failed_batch() {
        let store = MemoryStore::rejecting(vec![("students", 2)]);

        let err = insert_chunked(&store, "students", &numbered(5), 2, BatchFailure::Abort)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Failed to seed students batch 2");
        assert!(format!("{err:#}").contains("duplicate key"));
        assert_eq!(store.rows("students").len(), 2);
    }

    #[tokio::test]
    async fn empty_tables_are_not_sent() {
        let store = MemoryStore::rejecting(vec![("tests", 0)]);
        let rows: Vec<Value> = Vec::new();

        let inserted =
            insert_chunked(&store, "tests", &rows, 10, BatchFailure::Abort).await.unwrap();

        assert_eq!(inserted, 0);
        assert!(store.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn execute_writes_every_table_in_order() {
        let data = seeded();
        let store = MemoryStore::default();

        let summary = execute(&store, &data).await.unwrap();

        assert_eq!(summary, SeedSummary::planned(&data));
        for result in store.rows("results") {
            let original = data.results.iter().find(|r| json!(r.id) == result["id"]).unwrap();
            assert_eq!(result["score"].as_f64(), Some(original.score));
        }
    }

    #[tokio::test]
    async fn results_are_rescored_when_responses_are_lost() {
        let data = seeded();
        assert!(data.results.iter().any(|r| !r.answers.is_empty()));
        let store = MemoryStore::rejecting(vec![("exam_responses", 0)]);

        let summary = execute(&store, &data).await.unwrap();

        assert_eq!(summary.responses, 0);
        assert_eq!(summary.results, data.results.len());
        for result in store.rows("results") {
            assert_eq!(result["score"].as_f64(), Some(0.0));
            assert_eq!(result["answers"], json!({}));
        }
    }

    #[test]
    fn rescoring_with_the_stored_answers_keeps_the_result() {
        let data = seeded();
        let result = &data.results[0];
        let test = data.tests.iter().find(|t| t.id == result.test_id).unwrap();
        let stored = result
            .answers
            .iter()
            .map(|(question_id, response_data)| StoredResponse {
                question_id: question_id.clone(),
                response_data: response_data.clone(),
            })
            .collect();

        let rescored = rescore_result(result, test, stored);

        assert_eq!(rescored.score, result.score);
        assert_eq!(rescored.percentage, result.percentage);
        assert_eq!(rescored.status, result.status);
        assert_eq!(rescored.id, result.id);
    }

    #[tokio::test]
    async fn reset_clears_children_before_parents() {
        let data = seeded();
        let store = MemoryStore::default();
        execute(&store, &data).await.unwrap();

        reset(&store).await.unwrap();

        let deletes = store.deletes.lock().unwrap().clone();
        let expected: Vec<_> = SEED_TABLES.iter().rev().map(|t| t.to_string()).collect();
        assert_eq!(deletes, expected);
        assert!(SEED_TABLES.iter().all(|table| store.rows(table).is_empty()));
    }
}
