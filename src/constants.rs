//! Constants for command execution and CLI output recognition

/// Default SSH port when none is configured
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Sent once per SSH shell so long tables are not paged
pub const PAGER_OFF_COMMAND: &str = "terminal length 0";

/// Environment variable holding the SSH password
pub const PASSWORD_ENV: &str = "MCAST_INSPECTOR_PASSWORD";

/// Environment variable holding the passphrase of the SSH key file
pub const KEY_PASSPHRASE_ENV: &str = "MCAST_INSPECTOR_KEY_PASSPHRASE";

/// Per-command transport timeout
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 20;

/// Fragments a switch prints when it refuses a command (matched lowercase)
pub const CLI_REJECTION_MARKERS: &[&str] = &[
    "% invalid input",
    "invalid input detected",
    "unrecognized command",
    "command not found",
    "invalid command",
    "incomplete command",
    "not supported",
];

/// Phrases meaning "no querier on this segment" (matched lowercase)
pub const NO_QUERIER_MARKERS: &[&str] = &[
    "no querier",
    "querier not present",
    "querier is not present",
    "no igmp querier",
];

/// Querier port value that means the switch itself is querying
pub const LOCAL_QUERIER_PORTS: &[&str] = &["switch", "self", "router", "local"];

/// Unset address as printed by FASTPATH style CLIs
pub const UNSET_ADDRESS: &str = "0.0.0.0";

/// Long/short interface name prefixes used to compare ports across commands
pub const INTERFACE_ABBREVIATIONS: &[(&str, &str)] = &[
    ("hundredgigabitethernet", "hu"),
    ("fortygigabitethernet", "fo"),
    ("twentyfivegige", "twe"),
    ("tengigabitethernet", "te"),
    ("twogigabitethernet", "tw"),
    ("gigabitethernet", "gi"),
    ("fastethernet", "fa"),
    ("ethernet", "et"),
    ("port-channel", "po"),
    ("vlan", "vl"),
    ("lag", "lag"),
];

/// Cisco querier `key : value` fields that carry nothing the model needs
/// (matched lowercase, parenthesized units removed)
pub const CISCO_QUERIER_INFO_KEYS: &[&str] = &[
    "igmp version",
    "max response time",
    "admin state",
    "admin version",
    "source ip address",
    "query-interval",
    "query interval",
    "max-response-time",
    "querier-timeout",
    "tcn query count",
    "tcn query interval",
    "tcn query pending count",
    "operational state",
    "operational version",
];

/// Netgear querier `Key....... value` fields that carry nothing the model needs
pub const NETGEAR_QUERIER_INFO_KEYS: &[&str] = &[
    "igmp version",
    "querier query interval",
    "querier expiry interval",
    "igmp snooping querier vlan mode",
    "querier vlan mode",
    "querier election participate mode",
    "operational version",
    "last querier version",
    "operational max response time",
    "vlan id",
];
