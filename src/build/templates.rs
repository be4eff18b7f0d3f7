//! Generated build-context artifacts
//!
//! The entry-point shim and the container build descriptor written into the
//! build root. Both are data contracts: the shim adapts the user's exported
//! handler to the provider's function kit, and the descriptor is a two-stage
//! build that installs production dependencies before copying the project in.

use super::errors::BuildError;

/// File name of the generated entry-point shim.
pub const ENTRY_FILE_NAME: &str = "mdsEntry.js";

/// File name of the generated container build descriptor.
pub const DOCKERFILE_NAME: &str = "MdsDockerfile";

/// Renders the entry-point shim for a `module:export` pair.
///
/// The shim imports the named module, invokes the named export, awaits a
/// thenable result, and maps any falsy result to an empty object.
///
/// # Errors
///
/// Returns [`BuildError::InvalidEntryPoint`] when `entry_point` is not a
/// `module:export` pair.
pub fn entry_point_shim(entry_point: &str) -> Result<String, BuildError> {
    let (module, export) = entry_point
        .split_once(':')
        .ok_or_else(|| BuildError::InvalidEntryPoint(entry_point.to_string()))?;

    Ok(format!(
        r"const fdk = require('@fnproject/fdk');
const userModule = require('./{module}');

fdk.handle((input) => {{
  const result = userModule.{export}(input);
  if (result && result.then && typeof result.then === 'function') {{
    return result.then((innerResult) => innerResult || {{}});
  }}
  return result || {{}};
}});
"
    ))
}

/// Renders the two-stage container build descriptor.
///
/// Stage one installs production dependencies only; stage two starts from
/// the runtime image, copies the installed dependencies and the project
/// contents, and sets the shim as the container entrypoint.
#[must_use]
pub fn dockerfile(entry_file_name: &str) -> String {
    format!(
        r#"FROM fnproject/node:dev as build-stage
WORKDIR /function
ADD package.json /function/
RUN npm install --only=prod

FROM fnproject/node
WORKDIR /function
ADD . /function/
COPY --from=build-stage /function/node_modules/ /function/node_modules/
ENTRYPOINT ["node", "{entry_file_name}"]"#
    )
}
