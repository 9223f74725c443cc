//! Embedded JavaScript runtime for lambda modules.
//!
//! # Responsibilities
//! - Evaluate lambda sources as CommonJS modules
//! - Resolve `require` calls to project files and cache the modules
//! - Select the handler according to the `ExportStyle`
//! - Call handlers with a node-like `req`/`res` pair and collect the response
//!
//! # Design Decisions
//! - One engine per runtime thread; the engine is `!Send` and never leaves it
//! - Requests and responses cross the engine boundary as JSON text
//! - Modules are cached by absolute path in a `LambdaCache` that lives in
//!   the engine's heap, so lambdas and everything they `require` are
//!   dropped by the same subtree invalidation
//! - `require` only reaches relative paths inside the project root;
//!   `.js`, `.ts`, `.json` and `index.*` are tried in that order
//! - Pending promise jobs are drained after each call, then timers fire in
//!   due order on a virtual clock, until both queues are empty
//! - `console` output is buffered in the engine and re-emitted through
//!   `tracing` under the `lambda` target

use boa_engine::object::FunctionObjectBuilder;
use boa_engine::{
    js_string, Context, JsNativeError, JsObject, JsResult, JsString, JsValue, NativeFunction,
    Source,
};
use boa_gc::{Finalize, Gc, GcRefCell, Trace};
use serde::Deserialize;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::lambda::cache::LambdaCache;
use crate::lambda::error::LambdaError;
use crate::lambda::runtime::{ExportStyle, LambdaRequest, LambdaResponse, LambdaRuntime};
use crate::routing::resolver::normalize_path;

const PRELUDE: &str = include_str!("prelude.js");

/// Extensions `require` tries, in order, after the bare path.
const MODULE_EXTENSIONS: [&str; 3] = ["js", "ts", "json"];

/// Timer callbacks fired per invocation before the rest are dropped.
const MAX_TIMER_TURNS: usize = 10_000;

/// Modules evaluated by one engine, keyed by absolute path.
#[derive(Trace, Finalize)]
struct ModuleRegistry {
    root: PathBuf,
    modules: LambdaCache<JsObject>,
}

type Registry = Gc<GcRefCell<ModuleRegistry>>;

/// What one module's `require` closes over.
#[derive(Trace, Finalize)]
struct RequireScope {
    registry: Registry,
    dirname: PathBuf,
}

/// Boa-backed lambda runtime.
pub struct ScriptRuntime {
    context: Context,
    invoker: JsObject,
    run_timer: JsObject,
    drop_timers: JsObject,
    registry: Registry,
}

impl ScriptRuntime {
    /// Build an engine whose `require` is confined to `root`.
    pub fn new(root: &Path) -> Result<Self, LambdaError> {
        let mut context = Context::default();
        let host = context
            .eval(Source::from_bytes(PRELUDE))
            .map_err(|err| LambdaError::Protocol(format!("prelude failed to evaluate: {err}")))?;
        let host = host
            .as_object()
            .ok_or_else(|| LambdaError::Protocol("prelude did not produce an object".into()))?;

        let mut function = |name: JsString| -> Result<JsObject, LambdaError> {
            let value = host
                .get(name.clone(), &mut context)
                .map_err(|err| LambdaError::Protocol(err.to_string()))?;
            callable(&value).ok_or_else(|| {
                LambdaError::Protocol(format!(
                    "prelude `{}` is not a function",
                    name.to_std_string_escaped()
                ))
            })
        };
        let invoker = function(js_string!("invoke"))?;
        let run_timer = function(js_string!("runTimer"))?;
        let drop_timers = function(js_string!("dropTimers"))?;

        let registry = Gc::new(GcRefCell::new(ModuleRegistry {
            root: normalize_path(root),
            modules: LambdaCache::new(),
        }));

        Ok(Self {
            context,
            invoker,
            run_timer,
            drop_timers,
            registry,
        })
    }

    /// Number of modules currently cached in the engine.
    pub fn module_count(&self) -> usize {
        self.registry.borrow().modules.len()
    }

    /// Run promise jobs and due timers until neither has work left.
    fn drain(&mut self, url: &str) -> Result<(), LambdaError> {
        let protocol = |err: boa_engine::JsError| LambdaError::Protocol(err.to_string());

        for _ in 0..MAX_TIMER_TURNS {
            self.context.run_jobs().map_err(protocol)?;
            let fired = self
                .run_timer
                .call(&JsValue::undefined(), &[], &mut self.context)
                .map_err(protocol)?;
            if !fired.to_boolean() {
                return Ok(());
            }
        }

        let dropped = self
            .drop_timers
            .call(&JsValue::undefined(), &[], &mut self.context)
            .map_err(protocol)?;
        tracing::warn!(
            url,
            dropped = dropped.as_number().unwrap_or_default(),
            "Lambda kept scheduling timers; dropping the rest"
        );
        self.context.run_jobs().map_err(protocol)
    }
}

impl LambdaRuntime for ScriptRuntime {
    type Handler = JsObject;

    fn load(&mut self, path: &Path, style: ExportStyle) -> Result<JsObject, LambdaError> {
        let load_error = |message: String| LambdaError::Load {
            path: path.to_path_buf(),
            message,
        };

        let exports = load_module(&self.registry, path, &mut self.context)
            .map_err(|err| load_error(err.to_string()))?;

        let handler = match style {
            ExportStyle::Direct => exports,
            ExportStyle::Default => match exports.as_object() {
                Some(object) => object
                    .get(js_string!("default"), &mut self.context)
                    .map_err(|err| load_error(err.to_string()))?,
                None => JsValue::undefined(),
            },
        };

        callable(&handler).ok_or_else(|| LambdaError::InvalidLambda {
            path: path.to_path_buf(),
        })
    }

    fn invoke(
        &mut self,
        handler: &JsObject,
        request: &LambdaRequest,
    ) -> Result<LambdaResponse, LambdaError> {
        let payload =
            serde_json::to_string(request).map_err(|err| LambdaError::Protocol(err.to_string()))?;

        let reporter = self
            .invoker
            .call(
                &JsValue::undefined(),
                &[
                    JsValue::from(handler.clone()),
                    JsValue::from(JsString::from(payload.as_str())),
                ],
                &mut self.context,
            )
            .map_err(|err| LambdaError::Protocol(err.to_string()))?;
        let reporter = callable(&reporter)
            .ok_or_else(|| LambdaError::Protocol("invoke did not return a reporter".into()))?;

        self.drain(&request.url)?;

        let raw = reporter
            .call(&JsValue::undefined(), &[], &mut self.context)
            .and_then(|value| value.to_string(&mut self.context))
            .map_err(|err| LambdaError::Protocol(err.to_string()))?
            .to_std_string_escaped();

        let report: InvocationReport =
            serde_json::from_str(&raw).map_err(|err| LambdaError::Protocol(err.to_string()))?;
        report.into_result(&request.url)
    }

    fn invalidate_under(&mut self, root: &Path) -> usize {
        self.registry.borrow_mut().modules.invalidate_under(root)
    }
}

fn callable(value: &JsValue) -> Option<JsObject> {
    value
        .as_object()
        .filter(|object| object.is_callable())
        .map(|object| object.clone())
}

/// The exports of the module at `path`, evaluating it on a miss.
///
/// The module is registered before its body runs, so a cycle sees the
/// partially filled exports. A module that throws is forgotten.
fn load_module(registry: &Registry, path: &Path, context: &mut Context) -> JsResult<JsValue> {
    let cached = registry.borrow().modules.get(path);
    if let Some(module) = cached {
        return module.get(js_string!("exports"), context);
    }

    let filename = JsString::from(path.display().to_string().as_str());
    let exports = JsObject::with_object_proto(context.intrinsics());
    let module = JsObject::with_object_proto(context.intrinsics());
    module.set(js_string!("id"), filename.clone(), true, context)?;
    module.set(js_string!("filename"), filename, true, context)?;
    module.set(js_string!("exports"), exports.clone(), true, context)?;
    module.set(js_string!("loaded"), false, true, context)?;
    registry.borrow_mut().modules.insert(path, module.clone());

    if let Err(err) = evaluate_module(registry, path, &module, &exports, context) {
        registry.borrow_mut().modules.remove(path);
        return Err(err);
    }

    module.set(js_string!("loaded"), true, true, context)?;
    module.get(js_string!("exports"), context)
}

fn evaluate_module(
    registry: &Registry,
    path: &Path,
    module: &JsObject,
    exports: &JsObject,
    context: &mut Context,
) -> JsResult<()> {
    let source = fs::read_to_string(path).map_err(|err| {
        JsNativeError::error().with_message(format!("Cannot read {}: {err}", path.display()))
    })?;

    if path.extension().is_some_and(|ext| ext == "json") {
        let json: serde_json::Value = serde_json::from_str(&source).map_err(|err| {
            JsNativeError::syntax().with_message(format!("{}: {err}", path.display()))
        })?;
        let value = JsValue::from_json(&json, context)?;
        module.set(js_string!("exports"), value, true, context)?;
        return Ok(());
    }

    let factory = context.eval(Source::from_bytes(&wrap_commonjs(&source)))?;
    let factory = callable(&factory)
        .ok_or_else(|| JsNativeError::typ().with_message("module wrapper is not a function"))?;

    let dirname = path.parent().map(Path::to_path_buf).unwrap_or_default();
    let dirname_value = JsValue::from(JsString::from(dirname.display().to_string().as_str()));
    let require_fn = require_function(
        RequireScope {
            registry: registry.clone(),
            dirname,
        },
        context,
    );

    factory.call(
        &JsValue::from(exports.clone()),
        &[
            JsValue::from(exports.clone()),
            require_fn,
            JsValue::from(module.clone()),
            JsValue::from(JsString::from(path.display().to_string().as_str())),
            dirname_value,
        ],
        context,
    )?;
    Ok(())
}

/// Wrap a module source as a CommonJS factory function.
///
/// The source starts on the wrapper's first line so engine line numbers
/// match the file.
fn wrap_commonjs(source: &str) -> String {
    format!("(function (exports, require, module, __filename, __dirname) {{ {source}\n}})")
}

fn require_function(scope: RequireScope, context: &mut Context) -> JsValue {
    FunctionObjectBuilder::new(
        context.realm(),
        NativeFunction::from_copy_closure_with_captures(require, scope),
    )
    .name(js_string!("require"))
    .length(1)
    .build()
    .into()
}

fn require(
    _this: &JsValue,
    args: &[JsValue],
    scope: &RequireScope,
    context: &mut Context,
) -> JsResult<JsValue> {
    let specifier = args
        .first()
        .and_then(JsValue::as_string)
        .ok_or_else(|| {
            JsNativeError::typ().with_message("The \"id\" argument must be of type string")
        })?
        .to_std_string_escaped();

    let root = scope.registry.borrow().root.clone();
    let path = resolve_module(&root, &scope.dirname, &specifier)
        .map_err(|message| JsNativeError::error().with_message(message))?;

    load_module(&scope.registry, &path, context)
}

/// Resolve a `require` specifier to a file under `root`.
fn resolve_module(root: &Path, dirname: &Path, specifier: &str) -> Result<PathBuf, String> {
    let relative = specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/');
    if !relative {
        return Err(format!(
            "Cannot find module '{specifier}': only project files can be required"
        ));
    }

    let base = normalize_path(&dirname.join(specifier));
    if !base.starts_with(root) {
        return Err(format!(
            "Cannot require '{specifier}' from {}: outside the project root",
            dirname.display()
        ));
    }

    let mut candidates = Vec::new();
    // The root itself can only resolve to its index file.
    if base != root {
        candidates.push(base.clone());
        candidates.extend(MODULE_EXTENSIONS.iter().map(|ext| with_extension_appended(&base, ext)));
    }
    candidates.extend(
        MODULE_EXTENSIONS
            .iter()
            .map(|ext| base.join(format!("index.{ext}"))),
    );

    candidates
        .into_iter()
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            format!(
                "Cannot find module '{specifier}' from {}",
                dirname.display()
            )
        })
}

fn with_extension_appended(path: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScriptError {
    message: String,
    status_code: Option<u16>,
    stack: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConsoleEntry {
    level: String,
    message: String,
}

/// What the prelude's reporter saw after the job queue drained.
#[derive(Debug, Deserialize)]
struct InvocationReport {
    ended: bool,
    settled: bool,
    failed: bool,
    response: LambdaResponse,
    error: Option<ScriptError>,
    #[serde(default)]
    logs: Vec<ConsoleEntry>,
}

impl InvocationReport {
    fn into_result(self, url: &str) -> Result<LambdaResponse, LambdaError> {
        for entry in &self.logs {
            match entry.level.as_str() {
                "error" => tracing::error!(target: "lambda", url, "{}", entry.message),
                "warn" => tracing::warn!(target: "lambda", url, "{}", entry.message),
                "debug" => tracing::debug!(target: "lambda", url, "{}", entry.message),
                _ => tracing::info!(target: "lambda", url, "{}", entry.message),
            }
        }

        match (self.failed, self.ended, self.error) {
            (true, false, Some(error)) => Err(LambdaError::Handler {
                status: error.status_code,
                message: error.message,
                stack: error.stack,
            }),
            (true, false, None) => Err(LambdaError::Handler {
                status: None,
                message: "lambda failed".into(),
                stack: None,
            }),
            (true, true, error) => {
                let message = error.map(|e| e.message).unwrap_or_default();
                tracing::warn!(url, %message, "Lambda failed after ending the response");
                Ok(self.response)
            }
            (false, ended, _) => {
                if !ended {
                    tracing::warn!(
                        url,
                        settled = self.settled,
                        "Lambda did not end the response; ending it"
                    );
                }
                Ok(self.response)
            }
        }
    }
}
