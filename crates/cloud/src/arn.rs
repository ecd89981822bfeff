// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ARN construction and parsing helpers.

/// Build a function ARN from a name, passing existing ARNs through.
pub fn lambda_arn(region: &str, account: &str, name_or_arn: &str) -> String {
    build_arn(
        |n| format!("arn:aws:lambda:{region}:{account}:function:{n}"),
        name_or_arn,
    )
}

/// Build a workflow ARN from a name, passing existing ARNs through.
pub fn step_arn(region: &str, account: &str, name_or_arn: &str) -> String {
    build_arn(
        |n| format!("arn:aws:states:{region}:{account}:stateMachine:{n}"),
        name_or_arn,
    )
}

fn build_arn(format: impl Fn(&str) -> String, name_or_arn: &str) -> String {
    if name_or_arn.starts_with("arn:") {
        return name_or_arn.to_string();
    }
    format(name_or_arn)
}

/// `(region, account, resource)` from an ARN.
pub fn region_account_resource(arn: &str) -> Option<(String, String, String)> {
    let parts: Vec<&str> = arn.splitn(6, ':').collect();
    match parts.as_slice() {
        ["arn", _partition, _service, region, account, resource] => {
            Some((region.to_string(), account.to_string(), resource.to_string()))
        }
        _ => None,
    }
}

/// The slash-delimited path of a role ARN's resource, e.g.
/// `role/step/project/config/role-name` → `/step/project/config/`.
pub fn role_path(role_arn: &str) -> String {
    let Some((_, _, resource)) = region_account_resource(role_arn) else {
        return "/".to_string();
    };

    let parts: Vec<&str> = resource.split('/').collect();
    if parts.len() <= 2 {
        return "/".to_string();
    }
    format!("/{}/", parts[1..parts.len() - 1].join("/"))
}

/// Replace `{{aws_region}}`, `{{aws_account}}`, and `{{lambda_name}}`
/// templates in a machine definition.
pub fn interpolate(definition: &str, region: &str, account: &str, lambda_name: &str) -> String {
    definition
        .replace("{{aws_region}}", region)
        .replace("{{aws_account}}", account)
        .replace("{{lambda_name}}", lambda_name)
}

#[cfg(test)]
#[path = "arn_tests.rs"]
mod tests;
