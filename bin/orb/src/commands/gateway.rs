use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path as AxumPath, Query, State,
    },
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post, put},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use orb_assist::{ChatRequest, ClassifyRequest, ExplainRequest, Intent, SearchClient};
use orb_core::{Config, Error, Paths, ShellEvent, SurfaceId, TabId, TabList};
use orb_providers::{create_provider, Provider};
use orb_proxy::{ProxyOutcome, ProxyService, CACHE_CONTROL, CONTENT_TYPE_HTML, FRAME_OPTIONS};
use orb_shell::{
    run_dispatcher, BridgeMessage, ContentSurface, SharedHost, ShellBus, ShellHost, SurfaceEvent,
    SurfaceFactory, SurfacePort, ViewMode,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc, Mutex};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::surface::ProxiedSurface;

const EVENT_BUFFER: usize = 256;
const API_KEY_MISSING: &str = "API key not configured";
const SURFACE_HEADER: &str = "x-orb-surface";

// ---------------------------------------------------------------------------
// Shared state passed to HTTP/WS handlers
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct GatewayState {
    host: SharedHost,
    proxy: ProxyService,
    /// `None` when no model API key is configured; AI routes answer 500.
    provider: Option<Arc<dyn Provider>>,
    search: Arc<SearchClient>,
    /// Fan-out of shell events to every WebSocket client
    events_tx: broadcast::Sender<ShellEvent>,
}

impl GatewayState {
    fn build(
        config: &Config,
        proxy: ProxyService,
        factory: Box<dyn SurfaceFactory>,
    ) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<SurfaceEvent>)> {
        let (events_tx, (surface_tx, surface_rx)) = ShellBus::new(EVENT_BUFFER).split();
        let host = ShellHost::new(&config.shell, factory, events_tx.clone(), surface_tx);

        let provider = match create_provider(config) {
            Ok(provider) => Some(provider),
            Err(e) => {
                warn!(error = %e, "AI routes will answer 500 until a key is configured");
                None
            }
        };
        let search = SearchClient::new(&config.search)?;

        let state = Self {
            host: Arc::new(Mutex::new(host)),
            proxy,
            provider,
            search: Arc::new(search),
            events_tx,
        };
        Ok((state, surface_rx))
    }
}

fn proxied_surfaces(proxy: ProxyService) -> Box<dyn SurfaceFactory> {
    Box::new(move |port: SurfacePort| -> Box<dyn ContentSurface> {
        Box::new(ProxiedSurface::new(port, proxy.clone()))
    })
}

// ---------------------------------------------------------------------------
// Response helpers
// ---------------------------------------------------------------------------

fn status_code(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn json_error(status: u16, body: Value) -> Response {
    (status_code(status), Json(body)).into_response()
}

fn html_response(html: String) -> Response {
    (
        [
            (header::CONTENT_TYPE, CONTENT_TYPE_HTML),
            (header::CACHE_CONTROL, CACHE_CONTROL),
            (header::X_FRAME_OPTIONS, FRAME_OPTIONS),
        ],
        html,
    )
        .into_response()
}

/// A body or path axum could not extract, answered in the same `{error}` shape.
fn rejected(rejection: impl std::fmt::Display) -> Response {
    json_error(400, json!({ "error": format!("Invalid request: {}", rejection) }))
}

/// AI route failure: validation is 400, an upstream status is passed through, the rest is 500.
fn assist_error(e: &Error) -> Response {
    let (status, message) = match e {
        Error::Validation(msg) => (400, msg.clone()),
        Error::Upstream { status, message } => (*status, message.clone()),
        Error::MalformedResponse(msg) => (500, msg.clone()),
        _ => (500, "Internal server error".to_string()),
    };
    json_error(status, json!({ "error": message }))
}

// ---------------------------------------------------------------------------
// Proxy
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ProxyQuery {
    url: Option<String>,
    #[serde(rename = "preserveCSS")]
    preserve_css: Option<String>,
}

/// GET /proxy?url=&preserveCSS=
async fn handle_proxy(State(state): State<GatewayState>, Query(params): Query<ProxyQuery>) -> Response {
    let preserve_css = params.preserve_css.as_deref() == Some("true");
    match state.proxy.handle(params.url.as_deref(), preserve_css).await {
        ProxyOutcome::Page(html) => html_response(html),
        ProxyOutcome::Failed {
            status,
            error,
            retryable,
        } => json_error(status, json!({ "error": error, "retryable": retryable })),
    }
}

// ---------------------------------------------------------------------------
// AI routes
// ---------------------------------------------------------------------------

/// POST /explain
async fn handle_explain(
    State(state): State<GatewayState>,
    body: Result<Json<ExplainRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected(rejection),
    };
    if req.selected_text.trim().is_empty() {
        return json_error(400, json!({ "error": "Selected text is required" }));
    }
    let Some(provider) = state.provider.as_ref() else {
        return json_error(500, json!({ "error": API_KEY_MISSING }));
    };
    match orb_assist::explain(provider.as_ref(), req).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            warn!(error = %e, "Explain request failed");
            assist_error(&e)
        }
    }
}

/// POST /chat
async fn handle_chat(State(state): State<GatewayState>, body: Result<Json<ChatRequest>, JsonRejection>) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected(rejection),
    };
    if req.prompt.trim().is_empty() {
        return json_error(400, json!({ "error": "Prompt is required" }));
    }
    let Some(provider) = state.provider.as_ref() else {
        return json_error(500, json!({ "error": API_KEY_MISSING }));
    };
    match orb_assist::chat(provider.as_ref(), &req.prompt).await {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            warn!(error = %e, "Chat request failed");
            assist_error(&e)
        }
    }
}

/// POST /classify-intent
async fn handle_classify(
    State(state): State<GatewayState>,
    body: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => {
            warn!(error = %rejection, "Unreadable classify request");
            return classify_failed();
        }
    };
    if req.query.trim().is_empty() {
        return json_error(400, json!({ "error": "Query is required" }));
    }
    let result = match state.provider.as_ref() {
        Some(provider) => orb_assist::classify(provider.as_ref(), &req.query).await,
        None => Err(Error::Config(API_KEY_MISSING.to_string())),
    };
    match result {
        Ok(resp) => Json(resp).into_response(),
        Err(e) => {
            warn!(error = %e, query = %req.query, "Intent classification failed");
            classify_failed()
        }
    }
}

fn classify_failed() -> Response {
    json_error(
        500,
        json!({ "error": "Failed to classify intent", "intent": Intent::Browse }),
    )
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
}

/// GET /search?q=
async fn handle_search(State(state): State<GatewayState>, Query(params): Query<SearchQuery>) -> Response {
    let query = params.q.trim();
    if query.is_empty() {
        return json_error(400, json!({ "error": "Query parameter is required" }));
    }
    if let Some(missing) = state.search.missing_keys() {
        return json_error(
            500,
            json!({
                "error": "Google Search API credentials not configured",
                "missingKeys": missing,
            }),
        );
    }
    match state.search.search(query).await {
        Ok(resp) => Json(resp).into_response(),
        Err(Error::Upstream { status: 429, message }) => {
            json_error(429, json!({ "error": message, "results": [] }))
        }
        Err(e) => {
            warn!(error = %e, query = %query, "Search failed");
            json_error(
                500,
                json!({
                    "error": "Failed to perform search",
                    "message": e.to_string(),
                    "results": [],
                }),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Control surface: tabs
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct CreateTabRequest {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UrlRequest {
    #[serde(default)]
    url: String,
}

#[derive(Debug, Deserialize)]
struct ModeRequest {
    mode: ViewMode,
}

#[derive(Debug, Deserialize)]
struct WindowRequest {
    width: u32,
    height: u32,
}

/// GET /v1/tabs
async fn handle_tabs_list(State(state): State<GatewayState>) -> Json<TabList> {
    Json(state.host.lock().await.views().list_tabs())
}

/// POST /v1/tabs
async fn handle_tab_create(
    State(state): State<GatewayState>,
    body: Result<Json<CreateTabRequest>, JsonRejection>,
) -> Response {
    let req = match body {
        Ok(Json(req)) => req,
        // A bare POST opens the default page.
        Err(JsonRejection::MissingJsonContentType(_)) => CreateTabRequest::default(),
        Err(rejection) => return rejected(rejection),
    };
    let mut host = state.host.lock().await;
    let id = host.views_mut().create_tab(req.url.as_deref());
    let surface = host.views().surface_for_tab(&id);
    Json(json!({ "id": id, "surface": surface })).into_response()
}

/// POST /v1/tabs/:id/switch — answers with the active tab id afterwards.
async fn handle_tab_switch(State(state): State<GatewayState>, AxumPath(id): AxumPath<String>) -> Json<Value> {
    let mut host = state.host.lock().await;
    let ok = host.views_mut().switch_tab(&TabId(id));
    Json(json!({ "ok": ok, "id": host.views().active_tab_id() }))
}

/// DELETE /v1/tabs/:id
async fn handle_tab_close(State(state): State<GatewayState>, AxumPath(id): AxumPath<String>) -> Json<Value> {
    let ok = state.host.lock().await.close_tab(&TabId(id));
    Json(json!({ "ok": ok }))
}

/// POST /v1/tabs/:id/navigate
async fn handle_tab_navigate(
    State(state): State<GatewayState>,
    AxumPath(id): AxumPath<String>,
    body: Result<Json<UrlRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected(rejection),
    };
    if req.url.trim().is_empty() {
        return json_error(400, json!({ "error": "URL is required" }));
    }
    let ok = state.host.lock().await.views_mut().navigate_tab(&TabId(id), req.url.trim());
    Json(json!({ "ok": ok })).into_response()
}

/// POST /v1/tabs/:id/reload
async fn handle_tab_reload(State(state): State<GatewayState>, AxumPath(id): AxumPath<String>) -> Json<Value> {
    let ok = state.host.lock().await.views_mut().reload_tab(&TabId(id));
    Json(json!({ "ok": ok }))
}

/// PUT /v1/tabs/:id/mode
async fn handle_tab_mode(
    State(state): State<GatewayState>,
    AxumPath(id): AxumPath<String>,
    body: Result<Json<ModeRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected(rejection),
    };
    let ok = state.host.lock().await.set_view_mode(&TabId(id), req.mode);
    Json(json!({ "ok": ok, "mode": req.mode })).into_response()
}

/// GET /v1/tabs/:id/content — the frame document for a tab.
///
/// Enhanced tabs get the embedding rewrite of the live URL. Direct tabs are
/// redirected to the page itself.
async fn handle_tab_content(State(state): State<GatewayState>, AxumPath(id): AxumPath<String>) -> Response {
    let id = TabId(id);
    let (url, mode, surface) = {
        let host = state.host.lock().await;
        let views = host.views();
        match (views.tab_url(&id), views.view_mode(&id), views.surface_for_tab(&id)) {
            (Some(url), Some(mode), Some(surface)) => (url, mode, surface),
            _ => {
                let e = Error::NotFound(format!("tab {}", id));
                return json_error(e.http_status(), json!({ "error": "Tab not found" }));
            }
        }
    };

    if mode == ViewMode::Direct {
        return Redirect::temporary(&url).into_response();
    }

    match state.proxy.embed_page(&url).await {
        Ok(page) => {
            debug!(tab_id = %id, url = %page.final_url, "Serving embedded page");
            let mut response = html_response(page.html);
            if let Ok(value) = HeaderValue::from_str(&surface.0.to_string()) {
                response.headers_mut().insert(SURFACE_HEADER, value);
            }
            response
        }
        Err(e) => {
            warn!(tab_id = %id, url = %url, error = %e, "Embedding failed");
            json_error(
                e.http_status(),
                json!({ "error": e.to_string(), "url": url, "retryable": e.is_retryable() }),
            )
        }
    }
}

// ---------------------------------------------------------------------------
// Control surface: surfaces, overlay, window
// ---------------------------------------------------------------------------

/// POST /v1/surfaces/:id/highlight — forwards a bridge message from a tab's frame.
async fn handle_surface_bridge(
    State(state): State<GatewayState>,
    surface: Result<AxumPath<u64>, PathRejection>,
    body: Result<Json<BridgeMessage>, JsonRejection>,
) -> Response {
    let (AxumPath(surface), Json(message)) = match (surface, body) {
        (Ok(surface), Ok(body)) => (surface, body),
        (Err(rejection), _) => return rejected(rejection),
        (_, Err(rejection)) => return rejected(rejection),
    };
    let mut host = state.host.lock().await;
    host.handle_bridge(SurfaceId(surface), message);
    Json(json!({ "overlay": host.overlay() })).into_response()
}

/// POST /v1/surfaces/:id/window-open
async fn handle_surface_window_open(
    State(state): State<GatewayState>,
    surface: Result<AxumPath<u64>, PathRejection>,
    body: Result<Json<UrlRequest>, JsonRejection>,
) -> Response {
    let (AxumPath(surface), Json(req)) = match (surface, body) {
        (Ok(surface), Ok(body)) => (surface, body),
        (Err(rejection), _) => return rejected(rejection),
        (_, Err(rejection)) => return rejected(rejection),
    };
    let id = state
        .host
        .lock()
        .await
        .views_mut()
        .handle_window_open(SurfaceId(surface), &req.url);
    Json(json!({ "id": id })).into_response()
}

/// POST /v1/overlay/hide
async fn handle_overlay_hide(State(state): State<GatewayState>) -> Json<Value> {
    state.host.lock().await.hide_overlay();
    Json(json!({ "ok": true }))
}

/// PUT /v1/window
async fn handle_window_resize(
    State(state): State<GatewayState>,
    body: Result<Json<WindowRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected(rejection),
    };
    let mut host = state.host.lock().await;
    host.views_mut().resize(req.width, req.height);
    Json(json!({ "contentBounds": host.views().content_bounds() })).into_response()
}

/// GET /v1/health
async fn handle_health(State(state): State<GatewayState>) -> Json<Value> {
    let tabs = state.host.lock().await.views().list_tabs().list.len();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "tabs": tabs,
        "ai": state.provider.is_some(),
        "search": state.search.missing_keys().is_none(),
    }))
}

// ---------------------------------------------------------------------------
// WebSocket event stream
// ---------------------------------------------------------------------------

/// GET /v1/ws
async fn handle_ws_upgrade(ws: WebSocketUpgrade, State(state): State<GatewayState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(socket: WebSocket, state: GatewayState) {
    info!("Control surface connected");

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let mut events_rx = state.events_tx.subscribe();
    // A late subscriber starts from the current tab list.
    let snapshot = ShellEvent::TabsUpdated(state.host.lock().await.views().list_tabs());

    let send_task = tokio::spawn(async move {
        let mut pending = Some(snapshot);
        loop {
            let event = match pending.take() {
                Some(event) => event,
                None => match events_rx.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Control surface lagging, events skipped");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            };
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize shell event");
                    continue;
                }
            };
            if ws_sender.send(WsMessage::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(WsMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    info!("Control surface disconnected");
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

fn build_router(state: GatewayState, config: &Config) -> Router {
    // The proxy keeps its own CORS policy: GET from any origin.
    let proxy = Router::new()
        .route("/proxy", get(handle_proxy))
        .layer(proxy_cors_layer());

    let api = Router::new()
        // AI
        .route("/explain", post(handle_explain))
        .route("/chat", post(handle_chat))
        .route("/classify-intent", post(handle_classify))
        .route("/search", get(handle_search))
        // Control surface
        .route("/v1/tabs", get(handle_tabs_list).post(handle_tab_create))
        .route("/v1/tabs/:id", axum::routing::delete(handle_tab_close))
        .route("/v1/tabs/:id/switch", post(handle_tab_switch))
        .route("/v1/tabs/:id/navigate", post(handle_tab_navigate))
        .route("/v1/tabs/:id/reload", post(handle_tab_reload))
        .route("/v1/tabs/:id/mode", put(handle_tab_mode))
        .route("/v1/tabs/:id/content", get(handle_tab_content))
        .route("/v1/surfaces/:id/highlight", post(handle_surface_bridge))
        .route("/v1/surfaces/:id/window-open", post(handle_surface_window_open))
        .route("/v1/overlay/hide", post(handle_overlay_hide))
        .route("/v1/window", put(handle_window_resize))
        .route("/v1/ws", get(handle_ws_upgrade))
        .route("/v1/health", get(handle_health))
        .layer(build_cors_layer(config));

    proxy
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn proxy_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .gateway
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    if origins.is_empty() {
        return CorsLayer::permissive().allow_credentials(false);
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub async fn run(cli_host: Option<String>, cli_port: Option<u16>) -> anyhow::Result<()> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;

    let host = cli_host.unwrap_or_else(|| config.gateway.host.clone());
    let port = cli_port.unwrap_or(config.gateway.port);

    let proxy = ProxyService::new(&config.proxy)?;
    let (state, surface_rx) = GatewayState::build(&config, proxy.clone(), proxied_surfaces(proxy))?;
    let dispatcher = tokio::spawn(run_dispatcher(Arc::clone(&state.host), surface_rx));

    {
        let mut shell = state.host.lock().await;
        let id = shell.views_mut().create_tab(None);
        info!(tab_id = %id, "Opened start tab");
    }

    let app = build_router(state, &config);
    let bind_addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "Gateway listening");
    println!("orb gateway listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    dispatcher.abort();
    info!("Gateway stopped");
    Ok(())
}
