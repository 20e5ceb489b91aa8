use crate::domain::{ContainerRecord, LabelScheme, PodIdentity, SidecarMarker, WorkContainer, WorkSet};
use crate::error::DiscoveryError;
use crate::services::events::{EventSink, SidecarEvent, SkipReason};

/// Outcome of a successful classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub marker: SidecarMarker,
    pub work_set: WorkSet,
}

/// Splits a pod's containers into the sidecar marker and the workload.
///
/// Containers are dropped when they carry no labels, belong to another pod,
/// are not ordinary workload containers (sandbox/pause), or have no name
/// label. Whatever remains is either the marker (name starts with `prefix`)
/// or a candidate. Candidates created at or before the marker are init
/// containers and are dropped too.
///
/// When several names match the prefix the last one listed becomes the
/// marker; each replacement is reported as [`SidecarEvent::MarkerReplaced`].
pub fn classify(
    records: Vec<ContainerRecord>,
    pod: &PodIdentity,
    scheme: &LabelScheme,
    prefix: &str,
    sink: &dyn EventSink,
) -> Result<Discovery, DiscoveryError> {
    let mut marker: Option<SidecarMarker> = None;
    let mut candidates = Vec::new();

    for record in records {
        if record.labels.is_empty() {
            sink.emit(skipped(&record, None, SkipReason::NoLabels));
            continue;
        }

        if !belongs_to(&record, pod, scheme) {
            let name = record.label(scheme.container_name).map(str::to_string);
            sink.emit(skipped(&record, name, SkipReason::ForeignPod));
            continue;
        }

        match record.label(scheme.kind) {
            Some(kind) if kind == scheme.workload_kind => {}
            kind => {
                let kind = kind.map(str::to_string);
                sink.emit(skipped(&record, None, SkipReason::NotWorkload { kind }));
                continue;
            }
        }

        let Some(name) = record.label(scheme.container_name).map(str::to_string) else {
            sink.emit(skipped(&record, None, SkipReason::MissingName));
            continue;
        };

        if name.starts_with(prefix) {
            let current = SidecarMarker {
                id: record.id,
                name,
                created: record.created,
            };
            sink.emit(SidecarEvent::MarkerFound {
                marker: current.clone(),
            });
            if let Some(previous) = marker.replace(current.clone()) {
                sink.emit(SidecarEvent::MarkerReplaced { previous, current });
            }
            continue;
        }

        candidates.push(WorkContainer {
            id: record.id,
            name,
            created: record.created,
        });
    }

    let Some(marker) = marker else {
        return Err(DiscoveryError::NoMarkerFound {
            pod: pod.clone(),
            prefix: prefix.to_string(),
        });
    };

    let mut work = Vec::with_capacity(candidates.len());
    for container in candidates {
        if container.created <= marker.created {
            sink.emit(SidecarEvent::Skipped {
                id: container.id,
                name: Some(container.name),
                reason: SkipReason::CreatedBeforeMarker {
                    created: container.created,
                    marker: marker.created,
                },
            });
            continue;
        }

        sink.emit(SidecarEvent::Discovered {
            container: container.clone(),
        });
        work.push(container);
    }

    if work.is_empty() {
        return Err(DiscoveryError::NoContainersFound { pod: pod.clone() });
    }

    Ok(Discovery {
        marker,
        work_set: WorkSet::new(work),
    })
}

fn belongs_to(record: &ContainerRecord, pod: &PodIdentity, scheme: &LabelScheme) -> bool {
    record.label(scheme.pod_namespace) == Some(pod.namespace.as_str())
        && record.label(scheme.pod_name) == Some(pod.name.as_str())
}

fn skipped(record: &ContainerRecord, name: Option<String>, reason: SkipReason) -> SidecarEvent {
    SidecarEvent::Skipped {
        id: record.id.clone(),
        name,
        reason,
    }
}
