use rand::Rng;

use crate::db::models::TestSettings;
use crate::db::types::{ProctoringLevel, ViolationSeverity};

/// A violation the simulator or a client report produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ViolationKind {
    pub(crate) code: &'static str,
    pub(crate) description: &'static str,
    pub(crate) severity: ViolationSeverity,
}

/// The four signals the simulator can fabricate.
pub(crate) const SIMULATED_VIOLATIONS: [ViolationKind; 4] = [
    ViolationKind {
        code: "face-not-detected",
        description: "Face not visible in camera",
        severity: ViolationSeverity::Medium,
    },
    ViolationKind {
        code: "tab-switch",
        description: "Tab switching detected",
        severity: ViolationSeverity::Medium,
    },
    ViolationKind {
        code: "voice-detected",
        description: "Voice detected during exam",
        severity: ViolationSeverity::Medium,
    },
    ViolationKind {
        code: "multiple-faces",
        description: "Multiple faces detected",
        severity: ViolationSeverity::Medium,
    },
];

pub(crate) const TAB_SWITCH: ViolationKind = ViolationKind {
    code: "tab-switch",
    description: "Student switched tabs during exam",
    severity: ViolationSeverity::Medium,
};

pub(crate) const CAMERA_ERROR: ViolationKind = ViolationKind {
    code: "camera-error",
    description: "Failed to access camera",
    severity: ViolationSeverity::Medium,
};

/// Event vocabulary used for seeded proctoring history.
pub(crate) const SEEDED_EVENT_TYPES: [&str; 12] = [
    "face_detected",
    "face_not_detected",
    "multiple_faces",
    "face_obscured",
    "tab_switch",
    "window_blur",
    "fullscreen_exit",
    "right_click",
    "copy_attempt",
    "paste_attempt",
    "suspicious_movement",
    "noise_detected",
];

/// One simulator tick: with `probability` picks one of the four simulated
/// violations uniformly, otherwise nothing.
pub(crate) fn roll<R: Rng + ?Sized>(rng: &mut R, probability: f64) -> Option<ViolationKind> {
    if probability <= 0.0 {
        return None;
    }
    if rng.gen::<f64>() >= probability {
        return None;
    }
    let index = rng.gen_range(0..SIMULATED_VIOLATIONS.len());
    Some(SIMULATED_VIOLATIONS[index])
}

pub(crate) fn simulator_enabled(settings: &TestSettings) -> bool {
    settings.proctoring_level != ProctoringLevel::Off
}

/// Tab switches are not recorded when the test explicitly allows them.
pub(crate) fn records_tab_switch(settings: &TestSettings) -> bool {
    !settings.allow_tab_switch
}

pub(crate) fn seeded_event_severity(event_type: &str) -> ViolationSeverity {
    match event_type {
        "face_not_detected" | "tab_switch" | "copy_attempt" => ViolationSeverity::High,
        "face_detected" | "noise_detected" => ViolationSeverity::Low,
        _ => ViolationSeverity::Medium,
    }
}
