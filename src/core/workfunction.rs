use crate::core::error::{BoxError, ProcessError};
use crate::core::sync_impl::dispatcher::{RunOptions, Runtime};
use crate::core::value::{CallArgs, Inputs, Outputs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// The identity of a workfunction, part of every content hash it produces.
///
/// Two functions sharing a name (and version) are treated as the same computation,
/// so their results can fast-forward each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FunctionId {
    pub name: String,
    pub version: Option<String>,
}

impl FunctionId {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}@{}", self.name, version),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for FunctionId {
    fn from(name: &str) -> Self {
        FunctionId::new(name)
    }
}

/// Defines the body of a workfunction.
pub trait ProcessLogic: Send + Sync + 'static {
    /// Computes the outputs from the bound inputs.
    fn exec(&self, inputs: &Inputs) -> Result<Outputs, BoxError>;

    /// Create a boxed clone of this trait object.
    fn clone_box(&self) -> Box<dyn ProcessLogic>;
}

impl Clone for Box<dyn ProcessLogic> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A computation that can only be invoked through a tracked [`Runtime`].
pub struct WorkFunction {
    identity: FunctionId,
    params: Vec<String>,
    var_kwargs: bool,
    /// The logic implementation that defines the function's behavior
    pub behaviour: Box<dyn ProcessLogic>,
}

impl Clone for WorkFunction {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            params: self.params.clone(),
            var_kwargs: self.var_kwargs,
            behaviour: self.behaviour.clone_box(),
        }
    }
}

impl fmt::Debug for WorkFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkFunction")
            .field("identity", &self.identity)
            .field("params", &self.params)
            .field("var_kwargs", &self.var_kwargs)
            .finish_non_exhaustive()
    }
}

impl WorkFunction {
    /// Creates a new workfunction with the given logic and no parameters.
    pub fn new<L: ProcessLogic>(identity: impl Into<FunctionId>, behaviour: L) -> Self {
        WorkFunction {
            identity: identity.into(),
            params: Vec::new(),
            var_kwargs: false,
            behaviour: Box::new(behaviour),
        }
    }

    /// Declares the parameter names positional arguments are bound to, in order.
    pub fn with_params(mut self, params: &[&str]) -> Self {
        self.params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Accepts keyword arguments that are not declared parameters.
    pub fn with_var_kwargs(mut self) -> Self {
        self.var_kwargs = true;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.identity = self.identity.with_version(version);
        self
    }

    pub fn identity(&self) -> &FunctionId {
        &self.identity
    }

    pub fn name(&self) -> &str {
        &self.identity.name
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Binds call arguments to parameter names.
    ///
    /// Positional arguments fill parameters in declaration order; keyword arguments
    /// are matched by name. Once bound, a call made positionally and one made by
    /// keyword produce identical [`Inputs`].
    pub fn bind(&self, args: CallArgs) -> Result<Inputs, ProcessError> {
        let (positional, named) = args.into_parts();
        if positional.len() > self.params.len() {
            return Err(self.invalid(format!(
                "takes {} positional argument(s) but {} were given",
                self.params.len(),
                positional.len()
            )));
        }

        let mut inputs = Inputs::new();
        for (name, value) in self.params.iter().zip(positional) {
            inputs.insert(name.clone(), value);
        }
        for (name, value) in named {
            if !self.var_kwargs && !self.params.contains(&name) {
                return Err(self.invalid(format!("unexpected keyword argument '{}'", name)));
            }
            if inputs.insert(name.clone(), value).is_some() {
                return Err(self.invalid(format!("multiple values for argument '{}'", name)));
            }
        }
        if let Some(missing) = self.params.iter().find(|p| !inputs.contains(p)) {
            return Err(self.invalid(format!("missing required argument '{}'", missing)));
        }
        Ok(inputs)
    }

    /// Calls the function through `runtime` with default options.
    pub fn call(&self, runtime: &Runtime, args: CallArgs) -> Result<Outputs, ProcessError> {
        runtime.run(self, args, RunOptions::default())
    }

    fn invalid(&self, reason: String) -> ProcessError {
        ProcessError::InvalidArguments {
            function: self.identity.to_string(),
            reason,
        }
    }
}

/// Closure-backed [`ProcessLogic`], as built by [`wrap`].
pub struct FnLogic<F> {
    body: Arc<F>,
}

impl<F> Clone for FnLogic<F> {
    fn clone(&self) -> Self {
        Self {
            body: Arc::clone(&self.body),
        }
    }
}

impl<F> ProcessLogic for FnLogic<F>
where
    F: Fn(&Inputs) -> Result<Outputs, BoxError> + Send + Sync + 'static,
{
    fn exec(&self, inputs: &Inputs) -> Result<Outputs, BoxError> {
        (self.body)(inputs)
    }

    fn clone_box(&self) -> Box<dyn ProcessLogic> {
        Box::new(self.clone())
    }
}

/// Wraps a closure into a trackable [`WorkFunction`].
///
/// ```rust
/// use orichalcum_workfunction::prelude::*;
///
/// let return_input = wrap("return_input", &["inp"], |inputs| {
///     let mut out = Outputs::new();
///     out.insert("result".into(), inputs.get("inp").cloned().unwrap_or_default());
///     Ok(out)
/// });
/// assert_eq!(return_input.params().len(), 1);
/// ```
pub fn wrap<F>(name: &str, params: &[&str], body: F) -> WorkFunction
where
    F: Fn(&Inputs) -> Result<Outputs, BoxError> + Send + Sync + 'static,
{
    WorkFunction::new(name, FnLogic {
        body: Arc::new(body),
    })
    .with_params(params)
}
