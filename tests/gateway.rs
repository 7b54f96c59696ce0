// ABOUTME: End-to-end gateway behavior against the in-memory runtime.
// ABOUTME: Every scenario runs in both the structured and the line-oriented result shape.

mod support;

use dockyard::config::{RetryPolicy, Timeouts};
use dockyard::gateway::{ErrorKind, Gateway};
use dockyard::records::ContainerState;
use dockyard::transport::{MemoryTransport, Request, Shape};
use dockyard::types::{Protocol, ResourceKind};
use dockyard::validate::{
    ContainerRequest, ImageRequest, ListFilter, NetworkRequest, RemoveRequest, VolumeRequest,
};
use std::time::Duration;
use support::{SHAPES, gateway, runtime};

fn web() -> ContainerRequest {
    ContainerRequest::new("web", "nginx:latest").ports("8080:80")
}

mod containers {
    use super::*;

    #[tokio::test]
    async fn create_starts_and_publishes_ports() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));

            let record = gateway.create_container(&web()).await.unwrap();

            assert!(record.has_name("web"), "{shape:?}");
            assert_eq!(record.state, ContainerState::Running, "{shape:?}");
            assert_eq!(record.ports.len(), 1, "{shape:?}");
            assert_eq!(record.ports[0].host_port, Some(8080));
            assert_eq!(record.ports[0].container_port, 80);
            assert_eq!(record.ports[0].protocol, Protocol::Tcp);
        }
    }

    #[tokio::test]
    async fn second_create_with_same_name_is_a_conflict() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));
            gateway.create_container(&web()).await.unwrap();

            let err = gateway.create_container(&web()).await.unwrap_err();

            assert_eq!(err.kind(), ErrorKind::Conflict, "{shape:?}");
            assert_eq!(err.to_string(), "container web already exists");
        }
    }

    #[tokio::test]
    async fn created_only_is_left_stopped() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));

            let record = gateway
                .create_container(&web().created_only())
                .await
                .unwrap();

            assert_eq!(record.state, ContainerState::Created, "{shape:?}");
            assert!(record.ports.is_empty());
            assert!(
                gateway
                    .list_containers(&ListFilter::default())
                    .await
                    .unwrap()
                    .is_empty()
            );
        }
    }

    #[tokio::test]
    async fn running_container_must_be_stopped_before_removal() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));
            gateway.create_container(&web()).await.unwrap();

            let err = gateway
                .remove_container(&RemoveRequest::new("web"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict, "{shape:?}");

            gateway.stop_container("web").await.unwrap();
            gateway
                .remove_container(&RemoveRequest::new("web"))
                .await
                .unwrap();

            let listing = gateway.list_containers(&ListFilter::all()).await.unwrap();
            assert!(!listing.records.iter().any(|c| c.has_name("web")));
        }
    }

    #[tokio::test]
    async fn forced_removal_of_running_container() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));
            gateway.create_container(&web()).await.unwrap();

            gateway
                .remove_container(&RemoveRequest::forced("web"))
                .await
                .unwrap();

            assert!(
                gateway
                    .list_containers(&ListFilter::all())
                    .await
                    .unwrap()
                    .is_empty()
            );
        }
    }

    #[tokio::test]
    async fn lifecycle_moves_between_states() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));
            let record = gateway.create_container(&web()).await.unwrap();
            let by_id = ListFilter::all().with_id(record.id.short());

            gateway.stop_container("web").await.unwrap();
            let listed = gateway.list_containers(&by_id).await.unwrap();
            assert_eq!(listed.records[0].state, ContainerState::Exited, "{shape:?}");

            gateway.restart_container("web").await.unwrap();
            let listed = gateway.list_containers(&by_id).await.unwrap();
            assert_eq!(listed.records[0].state, ContainerState::Running, "{shape:?}");
        }
    }

    #[tokio::test]
    async fn name_filter_is_exact() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));
            gateway.create_container(&web()).await.unwrap();
            gateway
                .create_container(&ContainerRequest::new("web2", "nginx:latest"))
                .await
                .unwrap();

            let listing = gateway
                .list_containers(&ListFilter::default().with_name("web"))
                .await
                .unwrap();

            assert_eq!(listing.len(), 1, "{shape:?}");
            assert!(listing.records[0].has_name("web"));
        }
    }

    #[tokio::test]
    async fn missing_image_is_not_found() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));

            let err = gateway
                .create_container(&ContainerRequest::new("cache", "redis:7"))
                .await
                .unwrap_err();

            assert_eq!(err.kind(), ErrorKind::NotFound, "{shape:?}");
            assert_eq!(err.to_string(), "image redis:7 not found");
        }
    }

    #[tokio::test]
    async fn lifecycle_target_is_validated() {
        let (gateway, transport) = gateway(runtime(Shape::Lines));

        let err = gateway.start_container("web; rm -rf /").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(transport.calls().is_empty());
    }
}

mod images {
    use super::*;

    #[tokio::test]
    async fn pull_returns_the_listed_image() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));

            let image = gateway
                .pull_image(&ImageRequest::new("redis:7"))
                .await
                .unwrap();

            assert_eq!(image.repository, "redis", "{shape:?}");
            assert_eq!(image.tag, "7");
            assert_eq!(image.size_bytes, 117_000_000);
        }
    }

    #[tokio::test]
    async fn local_image_is_a_conflict_unless_refreshed() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));

            let err = gateway
                .pull_image(&ImageRequest::new("docker.io/library/nginx:latest"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict, "{shape:?}");

            let image = gateway
                .pull_image(&ImageRequest::new("nginx:latest").refresh())
                .await
                .unwrap();
            assert_eq!(image.repo_tags, vec!["nginx:latest".to_string()]);
        }
    }

    #[tokio::test]
    async fn unknown_repository_is_unauthorized() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));

            let err = gateway
                .pull_image(&ImageRequest::new("nosuch/thing:1"))
                .await
                .unwrap_err();

            assert_eq!(err.kind(), ErrorKind::Unauthorized, "{shape:?}");
            assert!(err.detail().unwrap().contains("pull access denied"));
        }
    }

    #[tokio::test]
    async fn image_in_use_needs_force() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));
            gateway.create_container(&web()).await.unwrap();

            let err = gateway
                .remove_image(&RemoveRequest::new("nginx:latest"))
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Conflict, "{shape:?}");

            gateway
                .remove_image(&RemoveRequest::forced("nginx:latest"))
                .await
                .unwrap();
            assert!(
                gateway
                    .list_images(&ListFilter::default())
                    .await
                    .unwrap()
                    .is_empty()
            );
        }
    }

    #[tokio::test]
    async fn reference_filter_matches_exact_tag() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));
            gateway
                .pull_image(&ImageRequest::new("redis:7"))
                .await
                .unwrap();

            let listing = gateway
                .list_images(&ListFilter::default().with_reference("redis:7"))
                .await
                .unwrap();
            assert_eq!(listing.len(), 1, "{shape:?}");

            let listing = gateway
                .list_images(&ListFilter::default().with_reference("redis:6"))
                .await
                .unwrap();
            assert!(listing.is_empty(), "{shape:?}");
        }
    }
}

mod networks_and_volumes {
    use super::*;

    #[tokio::test]
    async fn network_create_and_remove() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));

            let network = gateway
                .create_network(
                    &NetworkRequest::new("backend")
                        .subnet("10.10.0.0/24")
                        .gateway("10.10.0.1")
                        .internal(),
                )
                .await
                .unwrap();

            assert_eq!(network.name, "backend", "{shape:?}");
            assert_eq!(network.driver, "bridge");
            assert!(network.internal);
            let ipam = network.ipam.unwrap();
            assert_eq!(ipam.subnet.as_deref(), Some("10.10.0.0/24"));
            assert_eq!(ipam.gateway.as_deref(), Some("10.10.0.1"));

            gateway
                .remove_network(&RemoveRequest::new(network.id.short()))
                .await
                .unwrap();
            assert!(
                gateway
                    .list_networks(&ListFilter::default())
                    .await
                    .unwrap()
                    .is_empty()
            );
        }
    }

    #[tokio::test]
    async fn overlapping_subnet_is_an_invalid_request() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));
            gateway
                .create_network(&NetworkRequest::new("one").subnet("10.20.0.0/16"))
                .await
                .unwrap();

            let err = gateway
                .create_network(&NetworkRequest::new("two").subnet("10.20.0.0/16"))
                .await
                .unwrap_err();

            assert_eq!(err.kind(), ErrorKind::InvalidRequest, "{shape:?}");
        }
    }

    #[tokio::test]
    async fn volume_create_reports_record() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));

            let volume = gateway
                .create_volume(&VolumeRequest::new("data").label("tier", "db"))
                .await
                .unwrap();

            assert_eq!(volume.name, "data", "{shape:?}");
            assert_eq!(volume.driver, "local");
            assert_eq!(volume.labels.get("tier").map(String::as_str), Some("db"));
            assert!(volume.created_at.is_some());
        }
    }

    #[tokio::test]
    async fn label_filter_selects_volumes() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));
            gateway
                .create_volume(&VolumeRequest::new("data").label("tier", "db"))
                .await
                .unwrap();
            gateway
                .create_volume(&VolumeRequest::new("cache"))
                .await
                .unwrap();

            let listing = gateway
                .list_volumes(&ListFilter::default().with_label("tier=db"))
                .await
                .unwrap();

            assert_eq!(listing.len(), 1, "{shape:?}");
            assert_eq!(listing.records[0].name, "data");
        }
    }
}

mod uniform_rules {
    use super::*;

    #[tokio::test]
    async fn empty_runtime_lists_nothing() {
        for shape in SHAPES {
            let (gateway, _) = gateway(MemoryTransport::with_shape(shape));
            let all = ListFilter::all();

            assert!(gateway.list_containers(&all).await.unwrap().is_empty());
            assert!(gateway.list_images(&all).await.unwrap().is_empty());
            assert!(gateway.list_networks(&all).await.unwrap().is_empty());
            assert!(gateway.list_volumes(&all).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn removing_a_missing_resource_is_not_found() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));

            let results = [
                gateway.remove_container(&RemoveRequest::new("ghost")).await,
                gateway.remove_image(&RemoveRequest::new("ghost:1")).await,
                gateway.remove_network(&RemoveRequest::new("ghost")).await,
                gateway.remove_volume(&RemoveRequest::new("ghost")).await,
            ];

            for result in results {
                assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound, "{shape:?}");
            }
        }
    }

    #[tokio::test]
    async fn existing_volume_or_image_is_refused_before_any_create() {
        for shape in SHAPES {
            let (gateway, transport) = gateway(runtime(shape));
            gateway
                .create_volume(&VolumeRequest::new("data"))
                .await
                .unwrap();
            let before = transport.calls().len();

            gateway
                .create_volume(&VolumeRequest::new("data"))
                .await
                .unwrap_err();
            gateway
                .pull_image(&ImageRequest::new("nginx:latest"))
                .await
                .unwrap_err();

            let creates = transport.calls()[before..]
                .iter()
                .filter(|call| matches!(call, Request::Create(_)))
                .count();
            assert_eq!(creates, 0, "{shape:?}");
        }
    }

    #[tokio::test]
    async fn duplicate_create_is_a_conflict_for_every_kind() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));
            gateway.create_container(&web()).await.unwrap();
            gateway
                .create_network(&NetworkRequest::new("backend"))
                .await
                .unwrap();
            gateway
                .create_volume(&VolumeRequest::new("data"))
                .await
                .unwrap();

            let kinds = [
                gateway.create_container(&web()).await.unwrap_err().kind(),
                gateway
                    .pull_image(&ImageRequest::new("nginx:latest"))
                    .await
                    .unwrap_err()
                    .kind(),
                gateway
                    .create_network(&NetworkRequest::new("backend"))
                    .await
                    .unwrap_err()
                    .kind(),
                gateway
                    .create_volume(&VolumeRequest::new("data"))
                    .await
                    .unwrap_err()
                    .kind(),
            ];

            assert_eq!(kinds, [ErrorKind::Conflict; 4], "{shape:?}");
        }
    }

    #[tokio::test]
    async fn concurrent_removes_have_one_winner() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));
            gateway.create_container(&web()).await.unwrap();
            let other = gateway.clone();
            let request = RemoveRequest::forced("web");

            let (a, b) = tokio::join!(
                gateway.remove_container(&request),
                other.remove_container(&request)
            );

            let outcomes = [a, b];
            assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1, "{shape:?}");
            let loser = outcomes.into_iter().find_map(Result::err).unwrap();
            assert_eq!(loser.kind(), ErrorKind::NotFound);
        }
    }

    #[tokio::test]
    async fn shapes_agree_on_every_record() {
        async fn populate(gateway: &Gateway) {
            gateway.create_container(&web()).await.unwrap();
            gateway
                .create_container(&ContainerRequest::new("idle", "nginx:latest").created_only())
                .await
                .unwrap();
            gateway
                .pull_image(&ImageRequest::new("redis:7"))
                .await
                .unwrap();
            gateway
                .create_network(&NetworkRequest::new("backend"))
                .await
                .unwrap();
            gateway
                .create_volume(&VolumeRequest::new("data"))
                .await
                .unwrap();
        }

        let (structured, _) = gateway(runtime(Shape::Structured));
        let (lines, _) = gateway(runtime(Shape::Lines));
        populate(&structured).await;
        populate(&lines).await;
        let all = ListFilter::all().with_size();

        let a = structured.list_containers(&all).await.unwrap().records;
        let b = lines.list_containers(&all).await.unwrap().records;
        assert_eq!(a.len(), 2);
        for (a, b) in a.iter().zip(&b) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.names, b.names);
            assert_eq!(a.image, b.image);
            assert_eq!(a.state, b.state);
            assert_eq!(a.created_at, b.created_at);
            assert_eq!(a.size_root_fs, b.size_root_fs);
            let ports = |c: &dockyard::records::ContainerRecord| {
                c.ports
                    .iter()
                    .map(|p| (p.host_port, p.container_port, p.protocol))
                    .collect::<Vec<_>>()
            };
            assert_eq!(ports(a), ports(b));
        }

        let a = structured.list_images(&all).await.unwrap().records;
        let b = lines.list_images(&all).await.unwrap().records;
        assert_eq!(a.len(), 2);
        for (a, b) in a.iter().zip(&b) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.repo_tags, b.repo_tags);
            assert_eq!(a.size_bytes, b.size_bytes);
            assert_eq!(a.created_at, b.created_at);
        }

        let a = structured.list_networks(&all).await.unwrap().records;
        let b = lines.list_networks(&all).await.unwrap().records;
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].id, b[0].id);
        assert_eq!(a[0].name, b[0].name);
        assert_eq!(a[0].ipam, b[0].ipam);
        assert_eq!(a[0].created_at, b[0].created_at);

        let a = structured.list_volumes(&all).await.unwrap().records;
        let b = lines.list_volumes(&all).await.unwrap().records;
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].name, b[0].name);
        assert_eq!(a[0].driver, b[0].driver);
        assert_eq!(a[0].created_at, b[0].created_at);
    }

    #[tokio::test]
    async fn unreadable_line_is_skipped_and_counted() {
        let transport = runtime(Shape::Lines).with_malformed_line(ResourceKind::Volume, r#"{"Name":"#);
        let (gateway, _) = gateway(transport);
        gateway
            .create_volume(&VolumeRequest::new("data"))
            .await
            .unwrap();

        let listing = gateway.list_volumes(&ListFilter::default()).await.unwrap();

        assert_eq!(listing.len(), 1);
        assert_eq!(listing.skipped, 1);
        assert_eq!(listing.records[0].name, "data");
    }
}

mod unavailable_runtime {
    use super::*;

    fn retrying(transport: MemoryTransport) -> (Gateway, std::sync::Arc<MemoryTransport>) {
        let (gateway, transport) = gateway(transport);
        let gateway = gateway.with_retry(RetryPolicy {
            attempts: 3,
            backoff: Duration::from_millis(1),
        });
        (gateway, transport)
    }

    #[tokio::test]
    async fn reads_are_retried_until_the_runtime_answers() {
        for shape in SHAPES {
            let (gateway, transport) = retrying(runtime(shape).unreachable_for(2));

            let listing = gateway.list_images(&ListFilter::default()).await.unwrap();

            assert_eq!(listing.len(), 1, "{shape:?}");
            assert_eq!(transport.calls().len(), 3);
        }
    }

    #[tokio::test]
    async fn writes_are_never_retried() {
        for shape in SHAPES {
            let (gateway, transport) = retrying(runtime(shape).unreachable_for(1));

            let err = gateway
                .create_network(&NetworkRequest::new("backend"))
                .await
                .unwrap_err();

            assert_eq!(err.kind(), ErrorKind::TransportUnavailable, "{shape:?}");
            assert!(!err.outcome_unknown());
            assert_eq!(transport.calls().len(), 1);
        }
    }

    #[tokio::test]
    async fn exhausted_retries_report_unavailable() {
        let (gateway, transport) = retrying(runtime(Shape::Structured).unreachable());

        let err = gateway.ping().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TransportUnavailable);
        assert_eq!(err.to_string(), "container runtime is unavailable");
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test]
    async fn timed_out_create_may_still_have_happened() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape).with_delay(Duration::from_millis(200)));
            let impatient = gateway.clone().with_timeouts(Timeouts {
                call: Duration::from_millis(20),
                ..Timeouts::default()
            });

            let err = impatient
                .create_container(&web().created_only())
                .await
                .unwrap_err();

            assert_eq!(err.kind(), ErrorKind::TransportUnavailable, "{shape:?}");
            assert!(err.outcome_unknown());

            let listing = gateway
                .list_containers(&ListFilter::all().with_name("web"))
                .await
                .unwrap();
            assert_eq!(listing.len(), 1, "{shape:?}");
        }
    }
}

mod engine {
    use super::*;

    #[tokio::test]
    async fn summary_averages_running_containers() {
        for shape in SHAPES {
            let (gateway, _) = gateway(runtime(shape));
            gateway.create_container(&web()).await.unwrap();
            gateway
                .create_container(&ContainerRequest::new("api", "nginx:latest"))
                .await
                .unwrap();
            gateway
                .create_volume(&VolumeRequest::new("data"))
                .await
                .unwrap();

            let summary = gateway.engine_summary().await.unwrap();

            assert_eq!(summary.containers.running, 2, "{shape:?}");
            assert_eq!(summary.images, 1);
            assert_eq!(summary.volumes, 1);
            assert_eq!(summary.networks, 0);
            assert!((summary.cpu_percent - 15.0).abs() < 0.01, "{shape:?}");
            assert!((summary.memory_percent - 7.5).abs() < 0.01, "{shape:?}");
        }
    }

    #[tokio::test]
    async fn ping_does_not_change_state() {
        let (gateway, transport) = gateway(runtime(Shape::Lines));

        gateway.ping().await.unwrap();

        assert!(matches!(transport.calls().as_slice(), [Request::Ping]));
    }
}
