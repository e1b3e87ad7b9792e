//! Proxy-side protocol tests
//!
//! These hold the controller's end of the channels and answer the wire
//! protocol by hand, so no GPU is involved.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use chartgpu_bridge::{ChartProxy, InboundMessage, OutboundMessage, ProxyHandlers};
use chartgpu_shared::{
    AxisOptions, Capabilities, GridOptions, PointerEvent, PointerEventKind, ResolvedOptions, Theme,
};

fn options() -> ResolvedOptions {
    ResolvedOptions {
        grid: GridOptions::default(),
        x_axis: AxisOptions::value(),
        y_axis: AxisOptions::value(),
        series: vec![],
        theme: Theme::default(),
        palette: vec![],
        zoom: None,
        tooltip: None,
        legend: None,
        facet: None,
        animation: None,
        auto_scroll: false,
    }
}

fn capabilities() -> Capabilities {
    Capabilities {
        backend: "Vulkan".to_string(),
        preferred_format: "Bgra8UnormSrgb".to_string(),
        timestamp_query: true,
        max_texture_dimension_2d: 8192,
    }
}

/// Placeholder surface target; the fake controller never creates a real
/// surface from it.
fn test_surface_target() -> wgpu::SurfaceTarget<'static> {
    struct Dummy;
    impl wgpu::rwh::HasWindowHandle for Dummy {
        fn window_handle(
            &self,
        ) -> Result<wgpu::rwh::WindowHandle<'_>, wgpu::rwh::HandleError> {
            Err(wgpu::rwh::HandleError::Unavailable)
        }
    }
    impl wgpu::rwh::HasDisplayHandle for Dummy {
        fn display_handle(
            &self,
        ) -> Result<wgpu::rwh::DisplayHandle<'_>, wgpu::rwh::HandleError> {
            Err(wgpu::rwh::HandleError::Unavailable)
        }
    }
    wgpu::SurfaceTarget::Window(Box::new(Dummy))
}

struct Harness {
    proxy: ChartProxy,
    inbound_rx: mpsc::UnboundedReceiver<InboundMessage>,
    outbound_tx: mpsc::UnboundedSender<OutboundMessage>,
}

fn harness() -> Harness {
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    Harness {
        proxy: ChartProxy::from_channels(in_tx, out_rx, ProxyHandlers::default()),
        inbound_rx: in_rx,
        outbound_tx: out_tx,
    }
}

/// Answers the next inbound `Init` with `Ready`.
async fn answer_init(
    inbound_rx: &mut mpsc::UnboundedReceiver<InboundMessage>,
    outbound_tx: &mpsc::UnboundedSender<OutboundMessage>,
) {
    let message = inbound_rx.recv().await.expect("init message");
    let InboundMessage::Init {
        chart_id,
        message_id,
        ..
    } = message
    else {
        panic!("expected init, got {}", message.operation());
    };
    outbound_tx
        .send(OutboundMessage::Ready {
            chart_id,
            message_id,
            capabilities: capabilities(),
        })
        .unwrap();
}

#[tokio::test]
async fn pointer_events_dropped_until_ready() {
    let mut h = harness();

    h.proxy
        .forward_pointer_event(
            "chart-1",
            PointerEvent::new(PointerEventKind::Move, 1.0, 1.0, 0.0),
        )
        .unwrap();
    assert!(h.inbound_rx.try_recv().is_err());
    assert!(!h.proxy.is_initialized("chart-1"));
}

#[tokio::test]
async fn init_resolves_on_ready_and_opens_pointer_gate() {
    let mut h = harness();

    let init_call = h.proxy.init(
        Some("chart-a".to_string()),
        test_surface_target(),
        800,
        600,
        2.0,
        options(),
    );
    let ((chart_id, caps), ()) = tokio::join!(
        async { init_call.await.expect("init resolves") },
        answer_init(&mut h.inbound_rx, &h.outbound_tx),
    );

    assert_eq!(chart_id, "chart-a");
    assert!(caps.timestamp_query);
    assert!(h.proxy.is_initialized(&chart_id));

    // The gate is open now: pointer events pass through.
    h.proxy
        .forward_pointer_event(
            &chart_id,
            PointerEvent::new(PointerEventKind::Move, 1.0, 1.0, 0.0),
        )
        .unwrap();
    let forwarded = h.inbound_rx.recv().await.expect("pointer message");
    assert_eq!(forwarded.operation(), "forwardPointerEvent");
}

#[tokio::test]
async fn init_times_out_without_ready() {
    let h = harness();
    let proxy = h.proxy.with_request_timeout(Duration::from_millis(50));

    let err = proxy
        .init(None, test_surface_target(), 100, 100, 1.0, options())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "timeout");
}

#[tokio::test]
async fn init_rejects_on_correlated_error() {
    let mut h = harness();

    let init_call = h.proxy.init(
        Some("chart-err".to_string()),
        test_surface_target(),
        100,
        100,
        1.0,
        options(),
    );
    let answer = async {
        let message = h.inbound_rx.recv().await.expect("init message");
        let InboundMessage::Init { message_id, .. } = message else {
            panic!("expected init");
        };
        h.outbound_tx
            .send(OutboundMessage::Error {
                chart_id: "chart-err".to_string(),
                code: "graphics-init-failed".to_string(),
                operation: "init".to_string(),
                message: "no adapter".to_string(),
                message_id: Some(message_id),
            })
            .unwrap();
    };
    let (result, ()) = tokio::join!(init_call, answer);
    assert_eq!(result.unwrap_err().code(), "graphics-init-failed");
}

#[tokio::test]
async fn dispose_cancels_pending_requests() {
    let mut h = harness();
    let proxy = Arc::new(h.proxy.with_request_timeout(Duration::from_secs(5)));

    // Start an init that will never be answered.
    let pending_proxy = Arc::clone(&proxy);
    let pending_init = tokio::spawn(async move {
        pending_proxy
            .init(
                Some("chart-b".to_string()),
                test_surface_target(),
                100,
                100,
                1.0,
                options(),
            )
            .await
    });
    let _init_message = h.inbound_rx.recv().await.expect("init message");

    // Dispose: the pending init must reject with Disposed, not run to its
    // timeout; dispose itself resolves on the ack.
    let dispose_proxy = Arc::clone(&proxy);
    let disposer = tokio::spawn(async move { dispose_proxy.dispose("chart-b").await });

    let message = h.inbound_rx.recv().await.expect("dispose message");
    let InboundMessage::Dispose {
        chart_id,
        message_id,
    } = message
    else {
        panic!("expected dispose");
    };
    h.outbound_tx
        .send(OutboundMessage::Disposed {
            chart_id,
            cleanup_errors: vec![],
            message_id,
        })
        .unwrap();

    let init_result = pending_init.await.unwrap();
    assert_eq!(init_result.unwrap_err().code(), "disposed");

    let cleanup = disposer.await.unwrap().expect("dispose acked");
    assert!(cleanup.is_empty());
}

#[tokio::test]
async fn dispose_leaves_other_charts_pending_requests_alone() {
    let mut h = harness();
    let proxy = Arc::new(h.proxy.with_request_timeout(Duration::from_secs(5)));

    // Chart A's init stays in flight while chart B is disposed.
    let a_proxy = Arc::clone(&proxy);
    let a_init = tokio::spawn(async move {
        a_proxy
            .init(
                Some("chart-a".to_string()),
                test_surface_target(),
                100,
                100,
                1.0,
                options(),
            )
            .await
    });
    let a_init_message = h.inbound_rx.recv().await.expect("chart A init message");
    let InboundMessage::Init {
        message_id: a_message_id,
        ..
    } = a_init_message
    else {
        panic!("expected init");
    };

    let b_proxy = Arc::clone(&proxy);
    let b_disposer = tokio::spawn(async move { b_proxy.dispose("chart-b").await });

    let message = h.inbound_rx.recv().await.expect("chart B dispose message");
    let InboundMessage::Dispose {
        chart_id,
        message_id,
    } = message
    else {
        panic!("expected dispose");
    };
    assert_eq!(chart_id, "chart-b");
    h.outbound_tx
        .send(OutboundMessage::Disposed {
            chart_id,
            cleanup_errors: vec![],
            message_id,
        })
        .unwrap();
    b_disposer.await.unwrap().expect("chart B dispose acked");

    // Chart A's request survived the other chart's disposal and still
    // resolves on its own ready.
    assert!(!a_init.is_finished());
    h.outbound_tx
        .send(OutboundMessage::Ready {
            chart_id: "chart-a".to_string(),
            message_id: a_message_id,
            capabilities: capabilities(),
        })
        .unwrap();
    let (chart_id, caps) = a_init.await.unwrap().expect("chart A init resolves");
    assert_eq!(chart_id, "chart-a");
    assert!(caps.timestamp_query);
}

#[tokio::test]
async fn resize_coalesces_to_one_message_per_frame() {
    let mut h = harness();
    let chart_id = "chart-c";

    let init_call = h.proxy.init(
        Some(chart_id.to_string()),
        test_surface_target(),
        100,
        100,
        1.0,
        options(),
    );
    let (init_result, ()) = tokio::join!(
        init_call,
        answer_init(&mut h.inbound_rx, &h.outbound_tx),
    );
    init_result.expect("init");

    // A burst inside one frame interval: the first goes out immediately,
    // the rest buffer latest-wins.
    h.proxy
        .request_resize(chart_id, 100.0, 100.0, 1.0, false)
        .unwrap();
    h.proxy
        .request_resize(chart_id, 200.0, 150.0, 1.0, false)
        .unwrap();
    h.proxy
        .request_resize(chart_id, 800.0, 600.0, 2.0, true)
        .unwrap();

    let first = h.inbound_rx.recv().await.expect("first resize");
    let InboundMessage::Resize { css_width, .. } = first else {
        panic!("expected resize");
    };
    assert_eq!(css_width, 100.0);
    assert!(h.inbound_rx.try_recv().is_err(), "burst must coalesce");

    // The frame callback drains the buffered update with the latest values.
    h.proxy.flush_resize(chart_id).unwrap();
    let second = h.inbound_rx.recv().await.expect("flushed resize");
    let InboundMessage::Resize {
        css_width,
        css_height,
        dpr,
        request_render,
        ..
    } = second
    else {
        panic!("expected resize");
    };
    assert_eq!(
        (css_width, css_height, dpr, request_render),
        (800.0, 600.0, 2.0, true)
    );
}
