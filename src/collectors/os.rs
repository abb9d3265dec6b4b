//! One-shot static host inventory.
//!
//! Computed once at startup and published once to the attributes channel,
//! never re-sent.

use std::collections::BTreeMap;

use serde_json::{json, Value};
use sysinfo::System;

pub fn sys_info(sys: &System) -> BTreeMap<String, Value> {
    let hostname = System::host_name().unwrap_or_default();
    let machine = System::cpu_arch().unwrap_or_else(|| std::env::consts::ARCH.to_string());
    let kernel = System::kernel_version().unwrap_or_default();

    let mut info = BTreeMap::new();
    info.insert("hostname".into(), Value::String(hostname.clone()));
    info.insert("fqdn".into(), Value::String(fqdn(&hostname)));
    info.insert("machine".into(), Value::String(machine.clone()));
    info.insert(
        "platform".into(),
        Value::String(format!("{}-{}-{}", std::env::consts::OS, kernel, machine)),
    );
    info.insert(
        "processor".into(),
        Value::String(
            sys.cpus()
                .first()
                .map(|cpu| cpu.brand().trim().to_string())
                .unwrap_or_default(),
        ),
    );
    info.insert("system".into(), Value::String(std::env::consts::OS.into()));
    info.insert("release".into(), Value::String(kernel));
    info.insert(
        "version".into(),
        Value::String(System::long_os_version().unwrap_or_default()),
    );
    info.insert("cpu_count".into(), json!(sys.cpus().len()));
    info.insert(
        "physical_cpu_count".into(),
        sys.physical_core_count().map_or(Value::Null, |n| json!(n)),
    );
    info.insert("virtual_memory".into(), json!(sys.total_memory()));
    info.insert("swap_memory".into(), json!(sys.total_swap()));
    #[cfg(target_os = "linux")]
    {
        info.insert(
            "distribution".into(),
            Value::String(System::name().unwrap_or_default()),
        );
        info.insert(
            "distribution_version".into(),
            Value::String(System::os_version().unwrap_or_default()),
        );
        info.insert(
            "distribution_id".into(),
            Value::String(System::distribution_id()),
        );
    }
    info
}

/// Best effort: an already-qualified hostname wins, else the kernel's NIS
/// domainname when it is set to something real.
fn fqdn(hostname: &str) -> String {
    if hostname.contains('.') {
        return hostname.to_string();
    }
    #[cfg(target_os = "linux")]
    {
        if let Ok(domain) = std::fs::read_to_string("/proc/sys/kernel/domainname") {
            let domain = domain.trim();
            if !domain.is_empty() && domain != "(none)" {
                return format!("{hostname}.{domain}");
            }
        }
    }
    hostname.to_string()
}
