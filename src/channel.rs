// ── Windowing channel ─────────────────────────────────────────────────────────
//
// JSON method calls from the application side, decoded with serde and routed
// to the controller, plus the outgoing `onWindowChanged` / `onWindowDestroyed`
// notifications built from window events.

use std::rc::Rc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::{
    controller::{HostWindowController, WindowEvent},
    error::{CasementError, ErrorKind, Result},
    geometry::{Point, Rect, Size},
    positioner::{Anchor, ConstraintAdjustment, WindowPositioner},
    settings::{
        WindowCreationSettings, WindowMetadata, WindowModificationSettings, WindowSizing,
        WindowState,
    },
    view::ViewId,
};

pub const CHANNEL_NAME: &str = "casement/windowing";

pub const INVALID_VALUE_ERROR: &str = "Invalid Value";
pub const UNAVAILABLE_ERROR: &str = "Unavailable";

/// A method invocation in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// The reply to one incoming call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum MethodResponse {
    Success { result: Value },
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResponse {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Error {
            code: INVALID_VALUE_ERROR.to_owned(),
            message: message.into(),
        }
    }

    /// Construction and platform failures are `Unavailable`; everything the
    /// caller could have avoided is `Invalid Value`.
    fn from_error(e: &CasementError) -> Self {
        let code = match e.kind() {
            ErrorKind::Construction | ErrorKind::Platform => UNAVAILABLE_ERROR,
            ErrorKind::InvalidReference
            | ErrorKind::InvalidOperation
            | ErrorKind::InvalidArgument => INVALID_VALUE_ERROR,
        };
        Self::Error {
            code: code.to_owned(),
            message: e.to_string(),
        }
    }
}

// ── Arguments ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateArgs {
    size: [f64; 2],
    min_size: Option<[f64; 2]>,
    max_size: Option<[f64; 2]>,
    title: Option<String>,
    state: Option<String>,
    parent_view_id: Option<ViewId>,
    /// `[x, y, width, height]` relative to the parent's client area.
    anchor_rect: Option<[f64; 4]>,
    positioner_parent_anchor: Option<Anchor>,
    positioner_child_anchor: Option<Anchor>,
    positioner_offset: Option<[f64; 2]>,
    positioner_constraint_adjustment: Option<u32>,
}

impl CreateArgs {
    fn sizing(&self) -> WindowSizing {
        WindowSizing {
            size: to_size(self.size),
            min_size: self.min_size.map(to_size),
            max_size: self.max_size.map(to_size),
        }
    }

    fn state(&self) -> Result<Option<WindowState>> {
        self.state.as_deref().map(str::parse::<WindowState>).transpose()
    }

    fn positioner(&self) -> WindowPositioner {
        WindowPositioner {
            anchor_rect: self
                .anchor_rect
                .map(|[x, y, w, h]| Rect::new(Point::new(x, y), Size::new(w, h))),
            parent_anchor: self.positioner_parent_anchor.unwrap_or_default(),
            child_anchor: self.positioner_child_anchor.unwrap_or_default(),
            offset: self
                .positioner_offset
                .map_or_else(Point::default, |[x, y]| Point::new(x, y)),
            constraint_adjustment: self
                .positioner_constraint_adjustment
                .map_or_else(ConstraintAdjustment::empty, ConstraintAdjustment::from_bits_truncate),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModifyArgs {
    view_id: ViewId,
    size: Option<[f64; 2]>,
    title: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewArgs {
    view_id: ViewId,
}

fn to_size([width, height]: [f64; 2]) -> Size {
    Size::new(width, height)
}

fn decode<T: DeserializeOwned>(arguments: &Value) -> std::result::Result<T, MethodResponse> {
    if !arguments.is_object() {
        return Err(MethodResponse::invalid("Method call argument is not a map."));
    }
    serde_json::from_value(arguments.clone()).map_err(|e| MethodResponse::invalid(e.to_string()))
}

fn encode_metadata(metadata: &WindowMetadata) -> Value {
    let mut map = Map::new();
    map.insert("viewId".into(), json!(metadata.view_id));
    map.insert("archetype".into(), json!(metadata.archetype));
    map.insert("size".into(), json!([metadata.size.width, metadata.size.height]));
    if let Some(parent) = metadata.parent_id {
        map.insert("parentViewId".into(), json!(parent));
    }
    if let Some(state) = metadata.state {
        map.insert("state".into(), json!(state.as_str()));
    }
    if let Some(position) = metadata.relative_position {
        map.insert("relativePosition".into(), json!([position.x, position.y]));
    }
    Value::Object(map)
}

/// The outgoing call announcing `event`.
pub fn event_call(event: &WindowEvent) -> MethodCall {
    match event {
        WindowEvent::Changed {
            view_id,
            size,
            relative_position,
        } => {
            let mut map = Map::new();
            map.insert("viewId".into(), json!(view_id));
            map.insert("size".into(), json!([size.width, size.height]));
            if let Some(position) = relative_position {
                map.insert("relativePosition".into(), json!([position.x, position.y]));
            }
            MethodCall::new("onWindowChanged", Value::Object(map))
        }
        WindowEvent::Destroyed { view_id } => {
            MethodCall::new("onWindowDestroyed", json!({ "viewId": view_id }))
        }
    }
}

// ── Handler ───────────────────────────────────────────────────────────────────

/// Serves the windowing channel for one controller.
pub struct WindowingHandler {
    controller: Rc<HostWindowController>,
}

impl WindowingHandler {
    /// Route the controller's window events to `send` as outgoing calls.
    pub fn new(controller: Rc<HostWindowController>, send: Rc<dyn Fn(MethodCall)>) -> Self {
        controller.set_event_listener(Some(Rc::new(move |event: &WindowEvent| {
            send(event_call(event))
        })));
        Self { controller }
    }

    pub fn handle(&self, call: &MethodCall) -> MethodResponse {
        debug!(method = %call.method, "windowing call");
        let outcome = match call.method.as_str() {
            "createWindow" => self.create(call, Kind::Regular),
            "createDialog" => self.create(call, Kind::Dialog),
            "createPopup" => self.create(call, Kind::Popup),
            "modifyWindow" => self.modify(call),
            "destroyWindow" => self.destroy(call),
            _ => return MethodResponse::NotImplemented,
        };
        match outcome {
            Ok(result) => MethodResponse::Success { result },
            Err(response) => response,
        }
    }

    /// Decode a JSON call, handle it and encode the response.
    pub fn handle_json(&self, text: &str) -> Result<String> {
        let call: MethodCall = serde_json::from_str(text)?;
        Ok(serde_json::to_string(&self.handle(&call))?)
    }

    fn create(&self, call: &MethodCall, kind: Kind) -> std::result::Result<Value, MethodResponse> {
        let args: CreateArgs = decode(&call.arguments)?;
        let sizing = args.sizing();
        let settings = match kind {
            Kind::Regular => {
                let state = args.state().map_err(|e| MethodResponse::from_error(&e))?;
                WindowCreationSettings {
                    title: args.title.clone(),
                    state,
                    ..WindowCreationSettings::regular(sizing)
                }
            }
            Kind::Dialog => WindowCreationSettings {
                title: args.title.clone(),
                ..WindowCreationSettings::dialog(sizing, args.parent_view_id)
            },
            Kind::Popup => {
                let parent = args.parent_view_id.ok_or_else(|| {
                    MethodResponse::invalid("Value for 'parentViewId' key must not be null.")
                })?;
                WindowCreationSettings::popup(sizing, parent, args.positioner())
            }
        };
        let metadata = self
            .controller
            .create_window(&settings)
            .map_err(|e| MethodResponse::from_error(&e))?;
        Ok(encode_metadata(&metadata))
    }

    fn modify(&self, call: &MethodCall) -> std::result::Result<Value, MethodResponse> {
        let args: ModifyArgs = decode(&call.arguments)?;
        let state = args
            .state
            .as_deref()
            .map(str::parse::<WindowState>)
            .transpose()
            .map_err(|e| MethodResponse::from_error(&e))?;
        let changes = WindowModificationSettings {
            size: args.size.map(to_size),
            title: args.title,
            state,
        };
        self.controller
            .modify_window(args.view_id, &changes)
            .map_err(|e| MethodResponse::from_error(&e))?;
        Ok(Value::Null)
    }

    fn destroy(&self, call: &MethodCall) -> std::result::Result<Value, MethodResponse> {
        let args: ViewArgs = decode(&call.arguments)?;
        if args.view_id < 0 {
            return Err(MethodResponse::invalid(format!(
                "Value for 'viewId' ({}) cannot be negative.",
                args.view_id
            )));
        }
        self.controller.destroy_window(args.view_id).map_err(|_| {
            MethodResponse::invalid(format!("Can't find window with 'viewId' ({}).", args.view_id))
        })?;
        Ok(Value::Null)
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind {
    Regular,
    Dialog,
    Popup,
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::{config::HostConfig, platform::headless::HeadlessPlatform, view::InertViews};

    struct Fixture {
        handler: WindowingHandler,
        controller: Rc<HostWindowController>,
        sent: Rc<RefCell<Vec<MethodCall>>>,
    }

    fn fixture() -> Fixture {
        let controller = HostWindowController::new(
            Rc::new(HeadlessPlatform::new()),
            Rc::new(InertViews::new()),
            HostConfig::default(),
        );
        let sent = Rc::new(RefCell::new(Vec::new()));
        let outbox = Rc::clone(&sent);
        let handler = WindowingHandler::new(
            Rc::clone(&controller),
            Rc::new(move |call: MethodCall| outbox.borrow_mut().push(call)),
        );
        Fixture {
            handler,
            controller,
            sent,
        }
    }

    fn call(method: &str, arguments: Value) -> MethodCall {
        MethodCall::new(method, arguments)
    }

    fn success(response: MethodResponse) -> Value {
        match response {
            MethodResponse::Success { result } => result,
            other => panic!("expected success, got {other:?}"),
        }
    }

    fn error_code(response: MethodResponse) -> String {
        match response {
            MethodResponse::Error { code, .. } => code,
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[test]
    fn create_window_returns_metadata() {
        let fx = fixture();
        let result = success(fx.handler.handle(&call(
            "createWindow",
            json!({ "size": [800.0, 600.0], "title": "Main", "state": "WindowState.restored" }),
        )));
        assert_eq!(result["viewId"], json!(0));
        assert_eq!(result["size"], json!([800.0, 600.0]));
        assert_eq!(result["state"], json!("WindowState.restored"));
        assert_eq!(result["archetype"], json!("regular"));
    }

    #[test]
    fn missing_size_is_invalid_value() {
        let fx = fixture();
        let response = fx.handler.handle(&call("createWindow", json!({ "title": "x" })));
        assert_eq!(error_code(response), INVALID_VALUE_ERROR);
        assert_eq!(fx.controller.window_count(), 0);
    }

    #[test]
    fn non_map_arguments_are_rejected() {
        let fx = fixture();
        let response = fx.handler.handle(&call("createWindow", json!([1, 2])));
        assert_eq!(
            response,
            MethodResponse::Error {
                code: INVALID_VALUE_ERROR.to_owned(),
                message: "Method call argument is not a map.".to_owned(),
            }
        );
    }

    #[test]
    fn unknown_state_and_bad_sizes_are_invalid_value() {
        let fx = fixture();
        let bad_state = fx.handler.handle(&call(
            "createWindow",
            json!({ "size": [10.0, 10.0], "state": "WindowState.fullscreen" }),
        ));
        assert_eq!(error_code(bad_state), INVALID_VALUE_ERROR);
        let bad_size = fx
            .handler
            .handle(&call("createWindow", json!({ "size": [0.0, 10.0] })));
        assert_eq!(error_code(bad_size), INVALID_VALUE_ERROR);
    }

    #[test]
    fn dialogs_and_popups_report_their_parent() {
        let fx = fixture();
        success(fx.handler.handle(&call("createWindow", json!({ "size": [800.0, 600.0] }))));
        let dialog = success(fx.handler.handle(&call(
            "createDialog",
            json!({ "size": [300.0, 200.0], "parentViewId": 0 }),
        )));
        assert_eq!(dialog["parentViewId"], json!(0));
        assert!(dialog.get("state").is_none());

        let popup = success(fx.handler.handle(&call(
            "createPopup",
            json!({
                "size": [100.0, 50.0],
                "parentViewId": 1,
                "anchorRect": [0.0, 0.0, 20.0, 20.0],
                "positionerParentAnchor": "bottomLeft",
                "positionerChildAnchor": "topLeft",
                "positionerConstraintAdjustment": 15
            }),
        )));
        assert_eq!(popup["parentViewId"], json!(1));
        assert!(popup["relativePosition"].is_array());

        let orphan = fx
            .handler
            .handle(&call("createPopup", json!({ "size": [10.0, 10.0] })));
        assert_eq!(error_code(orphan), INVALID_VALUE_ERROR);
    }

    #[test]
    fn modify_window_applies_changes() {
        let fx = fixture();
        success(fx.handler.handle(&call("createWindow", json!({ "size": [800.0, 600.0] }))));
        success(fx.handler.handle(&call(
            "modifyWindow",
            json!({ "viewId": 0, "size": [400.0, 300.0], "state": "WindowState.maximized" }),
        )));
        let handle = fx.controller.window_handle(0).unwrap();
        assert_eq!(fx.controller.state(handle).unwrap(), WindowState::Maximized);

        let missing = fx
            .handler
            .handle(&call("modifyWindow", json!({ "viewId": 5, "title": "t" })));
        assert_eq!(error_code(missing), INVALID_VALUE_ERROR);
    }

    #[test]
    fn destroy_window_validates_the_view_id() {
        let fx = fixture();
        success(fx.handler.handle(&call("createWindow", json!({ "size": [800.0, 600.0] }))));
        let negative = fx
            .handler
            .handle(&call("destroyWindow", json!({ "viewId": -1 })));
        assert_eq!(error_code(negative), INVALID_VALUE_ERROR);
        let unknown = fx
            .handler
            .handle(&call("destroyWindow", json!({ "viewId": 9 })));
        assert_eq!(error_code(unknown), INVALID_VALUE_ERROR);

        assert_eq!(
            success(fx.handler.handle(&call("destroyWindow", json!({ "viewId": 0 })))),
            Value::Null
        );
        assert!(!fx.controller.has_top_level_windows());
    }

    #[test]
    fn unknown_methods_are_not_implemented() {
        let fx = fixture();
        assert_eq!(
            fx.handler.handle(&call("maximizeEverything", Value::Null)),
            MethodResponse::NotImplemented
        );
    }

    #[test]
    fn window_events_become_outgoing_calls() {
        let fx = fixture();
        success(fx.handler.handle(&call("createWindow", json!({ "size": [800.0, 600.0] }))));
        fx.sent.borrow_mut().clear();
        success(fx.handler.handle(&call(
            "modifyWindow",
            json!({ "viewId": 0, "size": [640.0, 480.0] }),
        )));
        success(fx.handler.handle(&call("destroyWindow", json!({ "viewId": 0 }))));

        let sent = fx.sent.borrow();
        assert_eq!(
            sent.first(),
            Some(&MethodCall::new(
                "onWindowChanged",
                json!({ "viewId": 0, "size": [640.0, 480.0] })
            ))
        );
        assert_eq!(
            sent.last(),
            Some(&MethodCall::new("onWindowDestroyed", json!({ "viewId": 0 })))
        );
    }

    #[test]
    fn json_round_trip_through_the_handler() {
        let fx = fixture();
        let reply = fx
            .handler
            .handle_json(r#"{"method":"createWindow","arguments":{"size":[320,240]}}"#)
            .unwrap();
        let response: MethodResponse = serde_json::from_str(&reply).unwrap();
        let result = success(response);
        assert_eq!(result["size"], json!([320.0, 240.0]));

        assert!(fx.handler.handle_json("not json").is_err());
    }
}
