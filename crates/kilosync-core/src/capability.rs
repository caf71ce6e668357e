// ── Capability snapshot ──
//
// The externally visible choice lists derived from the cache. Rebuilding
// the capability surface downstream is expensive, so a new snapshot is
// only installed when it differs structurally from the current one.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use crate::command::StartStopAction;
use crate::equality::{arrays_equal, deep_equal};
use crate::model::{Cache, StreamId};

/// A generic `{id, label}` dropdown entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub id: String,
    pub label: String,
}

/// A service dropdown entry. Carries no state, so toggling a service
/// on or off never changes the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceChoice {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub service_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilitySnapshot {
    pub stream_choices: Vec<Choice>,
    /// Keyed `"main"`, plus `"sub"` in multi-stream mode.
    pub service_choices: BTreeMap<String, Vec<ServiceChoice>>,
    pub start_stop_choices: Vec<Choice>,
}

impl CapabilitySnapshot {
    pub fn from_cache(cache: &Cache) -> Self {
        let stream_choices = cache
            .active_streams()
            .into_iter()
            .map(|id| Choice {
                id: id.as_str().to_owned(),
                label: id.label().to_owned(),
            })
            .collect();

        let mut service_choices = BTreeMap::new();
        service_choices.insert(
            StreamId::Main.as_str().to_owned(),
            service_choices_for(cache, StreamId::Main),
        );
        if cache.multi_stream_mode {
            service_choices.insert(
                StreamId::Sub.as_str().to_owned(),
                service_choices_for(cache, StreamId::Sub),
            );
        }

        let start_stop_choices = StartStopAction::ALL
            .iter()
            .map(|action| Choice {
                id: action.as_str().to_owned(),
                label: action.label().to_owned(),
            })
            .collect();

        Self {
            stream_choices,
            service_choices,
            start_stop_choices,
        }
    }

    pub fn services(&self, stream: StreamId) -> &[ServiceChoice] {
        self.service_choices
            .get(stream.as_str())
            .map_or(&[], Vec::as_slice)
    }

    pub fn has_stream(&self, stream: StreamId) -> bool {
        self.service_choices.contains_key(stream.as_str())
    }

    /// Whether `next` must replace `current`.
    ///
    /// No current snapshot always counts as a change. Otherwise the
    /// stream list is compared positionally, the keyed service structure
    /// deep-equal with key order ignored, and the main list positionally.
    pub fn differs(current: Option<&Self>, next: &Self) -> bool {
        let Some(current) = current else {
            return true;
        };
        let (Ok(old_streams), Ok(new_streams)) = (
            serde_json::to_value(&current.stream_choices),
            serde_json::to_value(&next.stream_choices),
        ) else {
            return true;
        };
        let (Ok(old_services), Ok(new_services)) = (
            serde_json::to_value(&current.service_choices),
            serde_json::to_value(&next.service_choices),
        ) else {
            return true;
        };
        let main = StreamId::Main.as_str();
        let old_main = old_services.get(main).cloned().unwrap_or(Value::Null);
        let new_main = new_services.get(main).cloned().unwrap_or(Value::Null);

        !arrays_equal(&old_streams, &new_streams)
            || !deep_equal(&old_services, &new_services)
            || !arrays_equal(&old_main, &new_main)
    }
}

fn service_choices_for(cache: &Cache, stream: StreamId) -> Vec<ServiceChoice> {
    cache
        .services(stream)
        .iter()
        .map(|s| ServiceChoice {
            id: s.id.clone(),
            label: s.label.clone(),
            service_type: s.service_type.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ServiceDescriptor;

    fn service(id: &str, kind: &str, enabled: bool) -> ServiceDescriptor {
        ServiceDescriptor {
            id: id.into(),
            label: kind.into(),
            service_type: kind.into(),
            enabled,
            status: None,
            url: None,
        }
    }

    fn cache_with(main: Vec<ServiceDescriptor>, multi: bool) -> Cache {
        let mut cache = Cache::empty();
        cache.services.insert(StreamId::Main, main);
        cache.multi_stream_mode = multi;
        cache
    }

    #[test]
    fn first_snapshot_always_differs() {
        let snapshot = CapabilitySnapshot::from_cache(&Cache::empty());
        assert!(CapabilitySnapshot::differs(None, &snapshot));
    }

    #[test]
    fn identical_lists_do_not_differ() {
        let snapshot = || {
            let services = vec![service("1", "Rtmp_push", true)];
            CapabilitySnapshot::from_cache(&cache_with(services, false))
        };
        let (a, b) = (snapshot(), snapshot());
        assert!(!CapabilitySnapshot::differs(Some(&a), &b));
    }

    #[test]
    fn enabled_flag_is_not_part_of_the_surface() {
        let snapshot = |enabled| {
            let services = vec![service("1", "Rtmp_push", enabled)];
            CapabilitySnapshot::from_cache(&cache_with(services, false))
        };
        let (off, on) = (snapshot(false), snapshot(true));
        assert!(!CapabilitySnapshot::differs(Some(&off), &on));
    }

    #[test]
    fn reordered_services_differ() {
        let a = CapabilitySnapshot::from_cache(&cache_with(
            vec![service("1", "Rtmp_push", true), service("2", "Srt_caller", true)],
            false,
        ));
        let b = CapabilitySnapshot::from_cache(&cache_with(
            vec![service("2", "Srt_caller", true), service("1", "Rtmp_push", true)],
            false,
        ));
        assert!(CapabilitySnapshot::differs(Some(&a), &b));
    }

    #[test]
    fn multi_stream_adds_streams_and_sub_services() {
        let single = CapabilitySnapshot::from_cache(&cache_with(vec![], false));
        let multi = CapabilitySnapshot::from_cache(&cache_with(vec![], true));

        assert_eq!(single.stream_choices.len(), 1);
        assert_eq!(multi.stream_choices.len(), 3);
        assert!(!single.has_stream(StreamId::Sub));
        assert!(multi.has_stream(StreamId::Sub));
        assert!(CapabilitySnapshot::differs(Some(&single), &multi));
    }

    #[test]
    fn start_stop_choices_are_fixed() {
        let snapshot = CapabilitySnapshot::from_cache(&Cache::empty());
        let ids: Vec<&str> = snapshot
            .start_stop_choices
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(ids, vec!["start", "stop", "toggle"]);
    }
}
