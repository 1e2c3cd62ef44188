//! ESXi host checks. Configuration is read through the provider's per-host
//! probes.

use super::{flag, refs, rules, CheckContext, CheckDefinition, CheckResult, Verdict};
use crate::provider::{
    SERVICE_NTP, SERVICE_SHELL, SERVICE_SSH, SETTING_DCUI_ACCESS, SETTING_ENABLE_MOB,
    SETTING_ESX_ADMINS_GROUP, SETTING_LOG_DIR, SETTING_LOG_HOST, SETTING_SHARE_FORCE_SALTING,
    SETTING_SHELL_INTERACTIVE_TIMEOUT, SETTING_SHELL_TIMEOUT, SETTING_SUPPRESS_SHELL_WARNING,
};
use vcevidence_schema::inventory::{ConnectionState, Host, SettingValue};
use vcevidence_schema::{Category, Severity};

const NOT_SET: &str = "Not set";
const NOT_REPORTED: &str = "setting not reported by the host";

pub fn checks() -> Vec<CheckDefinition<Host>> {
    vec![
        CheckDefinition::informational(
            "host.version",
            "ESXi version",
            Category::Inventory,
            refs::ASSET_INVENTORY,
            version,
        ),
        CheckDefinition::security(
            "host.ntp",
            "NTP configured & running",
            Category::Logging,
            refs::LOGGING,
            ntp,
        ),
        CheckDefinition::security(
            "host.logdir",
            "Persistent log directory",
            Category::Logging,
            refs::LOGGING,
            log_dir,
        ),
        CheckDefinition::security(
            "host.syslog",
            "Remote syslog target",
            Category::Logging,
            refs::LOGGING,
            syslog,
        ),
        CheckDefinition::security(
            "host.ssh",
            "SSH service",
            Category::Security,
            refs::ACCESS_HARDENING,
            ssh_service,
        ),
        CheckDefinition::security(
            "host.shell",
            "ESXi Shell service",
            Category::Security,
            refs::ACCESS_HARDENING,
            shell_service,
        ),
        CheckDefinition::security(
            "host.firewall",
            "Firewall default action",
            Category::Security,
            refs::NETWORK_SEGREGATION,
            firewall,
        ),
        CheckDefinition::security(
            "host.shell-timeouts",
            "Shell timeouts",
            Category::Security,
            refs::ACCESS_HARDENING,
            shell_timeouts,
        ),
        CheckDefinition::security(
            "host.shell-warning",
            "Shell warning suppressed",
            Category::Security,
            refs::ACCESS_HARDENING,
            shell_warning,
        ),
        CheckDefinition::security(
            "host.acceptance",
            "VIB acceptance level",
            Category::Security,
            refs::SOFTWARE_INTEGRITY,
            acceptance_level,
        ),
        CheckDefinition::security(
            "host.coredump",
            "Core dump target",
            Category::Resilience,
            refs::CONTINUITY,
            coredump,
        ),
        CheckDefinition::informational(
            "host.dcui",
            "DCUI access list",
            Category::Security,
            refs::ACCESS_HARDENING,
            dcui_access,
        ),
        CheckDefinition::security(
            "host.salting",
            "Memory sharing salting",
            Category::Security,
            refs::ACCESS_HARDENING,
            salting,
        ),
        CheckDefinition::security(
            "host.admins",
            "ESX admins group",
            Category::Security,
            refs::ACCESS_HARDENING,
            admins_group,
        ),
        CheckDefinition::security(
            "host.mob",
            "Managed Object Browser",
            Category::Security,
            refs::ACCESS_HARDENING,
            managed_object_browser,
        ),
    ]
}

fn setting(
    ctx: &CheckContext<'_>,
    host: &Host,
    key: &str,
) -> Result<Option<SettingValue>, super::CheckError> {
    Ok(ctx.provider.host_setting(&host.name, key)?)
}

/// Verdict for a value the host did not report.
fn unset() -> Verdict {
    Verdict::info(NOT_SET).with_notes(NOT_REPORTED)
}

fn version(host: &Host, _ctx: &CheckContext<'_>) -> CheckResult {
    let severity = if host.connection_state == ConnectionState::Connected {
        Severity::Info
    } else {
        Severity::Warn
    };
    let value = format!(
        "Version={}; Build={}; State={}; Maintenance={}",
        host.version,
        host.build,
        host.connection_state,
        flag(host.in_maintenance)
    );
    Ok(vec![Verdict::new(severity, value)])
}

fn ntp(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    let config = ctx.provider.host_ntp(&host.name)?;
    let service = ctx.provider.host_service(&host.name, SERVICE_NTP)?;
    let value = format!(
        "Servers=[{}]; Running={}",
        config.servers.join(", "),
        flag(service.running)
    );
    Ok(vec![Verdict::new(
        rules::ntp(&config.servers, service.running),
        value,
    )])
}

fn log_dir(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    let dir = setting(ctx, host, SETTING_LOG_DIR)?.and_then(|v| v.as_text());
    let verdict = match dir {
        Some(dir) => {
            let severity = rules::log_dir(Some(&dir));
            let verdict = Verdict::new(severity, dir);
            if severity == Severity::Warn {
                verdict.with_notes("logs on scratch storage do not persist across reboots")
            } else {
                verdict
            }
        }
        None => unset(),
    };
    Ok(vec![verdict])
}

fn syslog(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    let target = setting(ctx, host, SETTING_LOG_HOST)?.and_then(|v| v.as_text());
    let severity = rules::presence(target.as_deref(), true);
    let verdict = match target {
        Some(target) => Verdict::new(severity, target),
        None => Verdict::new(severity, NOT_SET).with_notes("no remote syslog target configured"),
    };
    Ok(vec![verdict])
}

fn remote_access(host: &Host, ctx: &CheckContext<'_>, service: &str) -> CheckResult {
    let state = ctx.provider.host_service(&host.name, service)?;
    let value = format!("Running={}; Policy={}", flag(state.running), state.policy);
    Ok(vec![Verdict::new(rules::remote_access_service(&state), value)])
}

fn ssh_service(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    remote_access(host, ctx, SERVICE_SSH)
}

fn shell_service(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    remote_access(host, ctx, SERVICE_SHELL)
}

fn firewall(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    let state = ctx.provider.host_firewall(&host.name)?;
    let value = format!(
        "Enabled={}; IncomingBlocked={}; OutgoingBlocked={}",
        flag(state.enabled),
        flag(state.default_incoming_blocked),
        flag(state.default_outgoing_blocked)
    );
    let verdict = if state.enabled {
        Verdict::info(value).with_notes("default action must be judged against site policy")
    } else {
        Verdict::warn(value).with_notes("host firewall is disabled")
    };
    Ok(vec![verdict])
}

fn shell_timeouts(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    let interactive =
        setting(ctx, host, SETTING_SHELL_INTERACTIVE_TIMEOUT)?.and_then(|v| v.as_int());
    let shell = setting(ctx, host, SETTING_SHELL_TIMEOUT)?.and_then(|v| v.as_int());
    let render = |v: Option<i64>| v.map_or_else(|| "unset".to_string(), |v| v.to_string());

    let severity = rules::shell_timeouts(interactive, shell);
    let mut verdict = Verdict::new(
        severity,
        format!("Interactive={}; Shell={}", render(interactive), render(shell)),
    );
    if severity == Severity::Info {
        verdict = verdict.with_notes(NOT_REPORTED);
    }
    Ok(vec![verdict])
}

fn shell_warning(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    let suppressed = setting(ctx, host, SETTING_SUPPRESS_SHELL_WARNING)?.and_then(|v| v.as_bool());
    Ok(vec![match suppressed {
        Some(value) => Verdict::new(rules::tri_state(Some(value), false), flag(value)),
        None => unset(),
    }])
}

fn acceptance_level(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    let level = ctx.provider.host_acceptance_level(&host.name)?;
    Ok(vec![Verdict::new(
        rules::acceptance_level(level),
        level.to_string(),
    )])
}

fn coredump(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    let target = ctx.provider.host_coredump(&host.name)?;
    Ok(vec![Verdict::new(rules::coredump(&target), target.to_string())])
}

fn dcui_access(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    let users = setting(ctx, host, SETTING_DCUI_ACCESS)?.and_then(|v| v.as_text());
    Ok(vec![match users {
        Some(users) => Verdict::info(users),
        None => unset(),
    }])
}

fn salting(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    let value = setting(ctx, host, SETTING_SHARE_FORCE_SALTING)?;
    Ok(vec![match value {
        Some(value) => {
            let severity = rules::salting(value.as_int());
            Verdict::new(severity, value.to_string())
        }
        None => unset(),
    }])
}

fn admins_group(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    let group = setting(ctx, host, SETTING_ESX_ADMINS_GROUP)?.and_then(|v| v.as_text());
    Ok(vec![match group {
        Some(group) => {
            let severity = rules::admins_group(Some(&group));
            let verdict = Verdict::new(severity, group);
            if severity == Severity::Warn {
                verdict.with_notes("default group name grants full host access")
            } else {
                verdict
            }
        }
        None => unset(),
    }])
}

fn managed_object_browser(host: &Host, ctx: &CheckContext<'_>) -> CheckResult {
    let enabled = setting(ctx, host, SETTING_ENABLE_MOB)?.and_then(|v| v.as_bool());
    Ok(vec![match enabled {
        Some(value) => Verdict::new(rules::tri_state(Some(value), false), flag(value)),
        None => unset(),
    }])
}
