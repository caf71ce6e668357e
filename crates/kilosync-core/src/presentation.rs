// ── Presentation builder ──
//
// Pure functions that turn a capability snapshot and the cache into what an
// operator console shows: action and feedback definitions, feedback
// predicates, display variables, and the static button presets.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::capability::{CapabilitySnapshot, Choice};
use crate::command::{Command, StartStopAction};
use crate::engine::FeedbackFamily;
use crate::model::{Cache, StreamId};

/// Shown for any variable the engine has not learned yet.
pub const UNKNOWN_VALUE: &str = "N/A";

/// One dropdown on an action or feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionField {
    pub id: &'static str,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<&'static str>,
    pub choices: Vec<Choice>,
    /// First choice, or `None` when the list is empty.
    pub default: Option<String>,
}

impl OptionField {
    fn new(id: &'static str, label: &'static str, choices: Vec<Choice>) -> Self {
        let default = choices.first().map(|c| c.id.clone());
        Self {
            id,
            label,
            tooltip: None,
            choices,
            default,
        }
    }

    fn with_tooltip(mut self, tooltip: &'static str) -> Self {
        self.tooltip = Some(tooltip);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub options: Vec<OptionField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub options: Vec<OptionField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariableDefinition {
    pub name: &'static str,
    pub label: &'static str,
}

/// A ready-made button: one recording action plus its state feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Preset {
    pub id: &'static str,
    pub category: &'static str,
    pub label: &'static str,
    pub text: &'static str,
    pub stream: StreamId,
    pub action: StartStopAction,
    pub feedback: FeedbackFamily,
}

impl Preset {
    pub fn command(&self) -> Command {
        Command::Recording {
            stream: self.stream,
            action: self.action,
        }
    }
}

// ── Actions ──────────────────────────────────────────────────────

pub fn action_definitions(snapshot: &CapabilitySnapshot) -> Vec<ActionDefinition> {
    let status = || {
        OptionField::new("status", "Status", snapshot.start_stop_choices.clone())
            .with_tooltip("Starts or Stops the current Recording")
    };
    let service_status = || {
        OptionField::new("status", "Status", snapshot.start_stop_choices.clone())
            .with_tooltip("Starts or Stops the current Service")
    };

    let mut actions = vec![
        ActionDefinition {
            id: "recording",
            name: "Toggle Recording",
            options: vec![
                OptionField::new("stream", "Stream", snapshot.stream_choices.clone()),
                status(),
            ],
        },
        ActionDefinition {
            id: "mainServiceStream",
            name: "Main Stream Service",
            options: vec![
                OptionField::new("service", "Service", service_options(snapshot, StreamId::Main))
                    .with_tooltip("Current service under the Main Stream"),
                service_status(),
            ],
        },
    ];

    if snapshot.has_stream(StreamId::Sub) {
        actions.push(ActionDefinition {
            id: "subServiceStream",
            name: "Sub Stream Service",
            options: vec![
                OptionField::new("service", "Service", service_options(snapshot, StreamId::Sub)),
                service_status(),
            ],
        });
    }

    actions
}

fn service_options(snapshot: &CapabilitySnapshot, stream: StreamId) -> Vec<Choice> {
    snapshot
        .services(stream)
        .iter()
        .map(|s| Choice {
            id: s.id.clone(),
            label: s.label.clone(),
        })
        .collect()
}

// ── Feedbacks ────────────────────────────────────────────────────

pub fn feedback_definitions(snapshot: &CapabilitySnapshot) -> Vec<FeedbackDefinition> {
    let mut feedbacks = vec![
        FeedbackDefinition {
            id: FeedbackFamily::Recording.id(),
            name: "Recording state",
            description: "Is the encoder recording or not",
            options: vec![OptionField::new(
                "stream",
                "Stream",
                snapshot.stream_choices.clone(),
            )],
        },
        FeedbackDefinition {
            id: FeedbackFamily::MainService.id(),
            name: "Main Service state",
            description: "Is Main service enabled or not",
            options: vec![OptionField::new(
                "service",
                "Service",
                service_options(snapshot, StreamId::Main),
            )],
        },
    ];

    if snapshot.has_stream(StreamId::Sub) {
        feedbacks.push(FeedbackDefinition {
            id: FeedbackFamily::SubService.id(),
            name: "Sub Service state",
            description: "Is Sub service enabled or not",
            options: vec![OptionField::new(
                "service",
                "Service",
                service_options(snapshot, StreamId::Sub),
            )],
        });
    }

    feedbacks
}

/// Evaluate one feedback predicate. `option` is the selected stream id
/// for recording, or the selected service id for the service families.
pub fn evaluate_feedback(cache: &Cache, family: FeedbackFamily, option: &str) -> bool {
    match family {
        FeedbackFamily::Recording => option
            .parse::<StreamId>()
            .is_ok_and(|stream| cache.is_recording(stream)),
        FeedbackFamily::MainService => service_enabled(cache, StreamId::Main, option),
        FeedbackFamily::SubService => service_enabled(cache, StreamId::Sub, option),
    }
}

fn service_enabled(cache: &Cache, stream: StreamId, service_id: &str) -> bool {
    cache
        .service(stream, service_id)
        .is_some_and(|s| s.enabled)
}

// ── Variables ────────────────────────────────────────────────────

pub fn variable_definitions() -> Vec<VariableDefinition> {
    vec![
        VariableDefinition {
            name: "deviceType",
            label: "Device Type",
        },
        VariableDefinition {
            name: "mainStreamIsRecording",
            label: "Main Stream is Recording",
        },
        VariableDefinition {
            name: "subStreamIsRecording",
            label: "Sub Stream is Recording",
        },
        VariableDefinition {
            name: "combinedStreamIsRecording",
            label: "Combined Stream is Recording",
        },
    ]
}

fn recording_variable(stream: StreamId) -> &'static str {
    match stream {
        StreamId::Main => "mainStreamIsRecording",
        StreamId::Sub => "subStreamIsRecording",
        StreamId::MainSub => "combinedStreamIsRecording",
    }
}

/// Current display values; anything unknown reads `N/A`.
pub fn variable_values(cache: &Cache) -> BTreeMap<&'static str, String> {
    let mut values = BTreeMap::new();
    values.insert(
        "deviceType",
        cache
            .device_type
            .clone()
            .unwrap_or_else(|| UNKNOWN_VALUE.to_owned()),
    );

    for (stream, state) in &cache.streams {
        let text = match state.is_recording {
            None => UNKNOWN_VALUE.to_owned(),
            Some(true) => format!("{stream} stream is recording"),
            Some(false) => format!("{stream} stream is not recording"),
        };
        values.insert(recording_variable(*stream), text);
    }

    values
}

// ── Presets ──────────────────────────────────────────────────────

pub fn presets() -> Vec<Preset> {
    vec![
        Preset {
            id: "start_recording_preset",
            category: "Recording",
            label: "Start Recording",
            text: "Start REC",
            stream: StreamId::Main,
            action: StartStopAction::Start,
            feedback: FeedbackFamily::Recording,
        },
        Preset {
            id: "stop_recording_preset",
            category: "Recording",
            label: "Stop Recording",
            text: "Stop REC",
            stream: StreamId::Main,
            action: StartStopAction::Stop,
            feedback: FeedbackFamily::Recording,
        },
    ]
}
