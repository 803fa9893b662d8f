//! `psi`: interactive process viewer.
//!
//! Lists the user's processes with listening ports and working directories.
//!
//! | Key | Action |
//! |---|---|
//! | `enter` | process details |
//! | `ctrl-k` | SIGKILL the process and reload |
//! | `ctrl-r` | reload |
//! | `ctrl-l` | toggle listening-only |
//! | `ctrl-o` | toggle extra columns (cpu, mem, stat, time) |
//! | `ctrl-\` | edit the ps command |
//!
//! `psi -l` prints the listening processes without the finder;
//! `--columns cpu,mem` picks the extra columns for that listing.

use fzfui::compiler::FinderOptions;
use fzfui::directive::wrap;
use fzfui::infrastructure::process::spawn_tool;
use fzfui::registry::{Action, Filter};
use fzfui::{App, FzfuiError, Result};
use std::ffi::OsString;
use std::io::{BufRead, Write};
use std::process::{Command, Stdio};

const OPTIONAL_COLUMNS: [&str; 4] = ["cpu", "mem", "stat", "time"];
const COLUMNS_ARG: &str = "columns";
const LISTENING_SUFFIX: &str = " | awk 'NR==1 || $2!=\"-\"'";
const TOGGLE_LISTENING: &str = "_toggle-listening";
const TOGGLE_COLUMNS: &str = "_toggle-columns";
const MAX_OPEN_FILES: usize = 20;
const MAX_COMMAND_WIDTH: usize = 70;

const PS_TEMPLATE: &str = r#"
ps -U $USER -o pid,%cpu,%mem,stat,time,command | awk '
BEGIN {
    OFS = "\t"
    cmd = "lsof -iTCP -sTCP:LISTEN -P -n 2>/dev/null"
    while ((cmd | getline line) > 0) {
        n = split(line, arr)
        if (n >= 9 && arr[1] != "COMMAND") {
            pid = arr[2]; port = arr[9]
            gsub(/.*:/, "", port); gsub(/\(LISTEN\)/, "", port)
            if (pid in ports) ports[pid] = ports[pid] "," port
            else ports[pid] = port
        }
    }
    close(cmd)
    cmd = "lsof -d cwd -a -u $USER 2>/dev/null"
    while ((cmd | getline line) > 0) {
        n = split(line, arr)
        if (n >= 9 && arr[1] != "COMMAND") {
            pid = arr[2]; cwd[pid] = arr[n]
        }
    }
    close(cmd)
}
NR == 1 {
    print @HEADER@
    next
}
{
    p = ($1 in ports) ? ports[$1] : "-"
    if (length(p) > 12) p = substr(p, 1, 9) "..."
    c = ($1 in cwd) ? cwd[$1] : "-"
    home = ENVIRON["HOME"]
    if (home != "" && index(c, home) == 1) c = "~" substr(c, length(home) + 1)
    if (length(c) > 50) c = substr(c, 1, 47) "..."
    cmd = ""
    for (i = 6; i <= NF; i++) cmd = cmd (i > 6 ? " " : "") $i
    if (length(cmd) > 80) cmd = substr(cmd, 1, 77) "..."
    print @DATA@
}
' | column -t -s $'\t'
"#;

/// Known columns from a comma-separated list, in display order.
fn parse_columns(value: &str) -> Vec<&'static str> {
    let requested: Vec<&str> = value.split(',').map(str::trim).collect();
    OPTIONAL_COLUMNS
        .into_iter()
        .filter(|c| requested.contains(c))
        .collect()
}

/// `--columns` from the command line, else from the exported argument.
fn columns_from(args: &[OsString], exported: Option<&str>) -> Vec<&'static str> {
    let flag = format!("--{COLUMNS_ARG}");
    let prefix = format!("--{COLUMNS_ARG}=");
    for (i, arg) in args.iter().enumerate() {
        let arg = arg.to_string_lossy();
        if arg == flag.as_str() {
            if let Some(value) = args.get(i + 1) {
                return parse_columns(&value.to_string_lossy());
            }
        } else if let Some(value) = arg.strip_prefix(&prefix) {
            return parse_columns(value);
        }
    }
    exported.map(parse_columns).unwrap_or_default()
}

/// awk field for each optional column in the `ps` output.
fn column_field(column: &str) -> &'static str {
    match column {
        "cpu" => "$2",
        "mem" => "$3",
        "stat" => "$4",
        _ => "$5",
    }
}

fn ps_command(columns: &[&str]) -> String {
    let mut header = vec!["$1", "\"PORTS\""];
    let mut data = vec!["$1", "p"];
    for column in columns {
        header.push(column_field(column));
        data.push(column_field(column));
    }
    header.extend(["\"CWD\"", "\"COMMAND\""]);
    data.extend(["c", "cmd"]);

    PS_TEMPLATE
        .replace("@HEADER@", &header.join(", "))
        .replace("@DATA@", &data.join(", "))
}

fn listening_command(columns: &[&str]) -> String {
    format!("{}{LISTENING_SUFFIX}", ps_command(columns).trim_end())
}

/// The conceptual `ps` invocation shown in the footer.
fn ps_footer(columns: &[&str]) -> String {
    let mut parts = vec!["pid"];
    for column in columns {
        parts.push(match *column {
            "cpu" => "%cpu",
            "mem" => "%mem",
            other => other,
        });
    }
    parts.push("command");
    format!("ps -U $USER -o {}", parts.join(","))
}

/// Filter pair `ctrl-l` switches between, keeping the column set.
fn listening_pair(current: Option<&str>) -> (&'static str, &'static str) {
    if current.is_some_and(|name| name.contains("full")) {
        ("all-full", "listening-full")
    } else {
        ("all", "listening")
    }
}

/// Filter `ctrl-o` switches to from `current`.
fn toggled_columns(current: Option<&str>) -> String {
    let name = current.unwrap_or("all");
    if name.contains("full") {
        name.replace("-full", "")
    } else {
        format!("{name}-full")
    }
}

fn register_filters(app: &mut App, cli_columns: &[&str]) {
    let footer_min = ps_footer(&[]);
    let footer_full = ps_footer(&OPTIONAL_COLUMNS);

    app.filter(Filter::new("all", ps_command(&[])).footer(&footer_min).default())
        .filter(Filter::new("all-full", ps_command(&OPTIONAL_COLUMNS)).footer(format!("{footer_full} [+cols]")))
        .filter(Filter::new("listening", listening_command(&[])).footer(format!("{footer_min} [listening]")))
        .filter(
            Filter::new("listening-full", listening_command(&OPTIONAL_COLUMNS))
                .footer(format!("{footer_full} [listening,+cols]")),
        );

    let suffix = if cli_columns.is_empty() {
        String::new()
    } else {
        format!(" [{}]", cli_columns.join(","))
    };
    app.filter(
        Filter::new("listening-cli", listening_command(cli_columns))
            .footer(format!("{} [listening]{suffix}", ps_footer(cli_columns)))
            .cli(["-l", "--listening"]),
    );
}

fn pid_of(selection: &str) -> Option<&str> {
    let pid = selection.trim();
    (!pid.is_empty() && pid.bytes().all(|b| b.is_ascii_digit())).then_some(pid)
}

fn capture(program: &str, args: &[&str]) -> Result<Option<String>> {
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null()).stderr(Stdio::null());
    let output = spawn_tool(&mut command, program)?.wait_with_output()?;
    Ok(output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).into_owned()))
}

fn wait_for_enter() -> Result<()> {
    print!("Press enter...");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(())
}

/// `lsof -p` rows reduced to type and name.
fn open_files(lsof: &str) -> String {
    let rows: Vec<String> = lsof
        .lines()
        .skip(1)
        .take(MAX_OPEN_FILES)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            (parts.len() >= 9).then(|| format!("        {:10} {}", parts[4], parts[8]))
        })
        .collect();
    if rows.is_empty() {
        "        (none)".to_string()
    } else {
        rows.join("\n")
    }
}

/// The first `count` whitespace-separated fields of `line` and the rest.
fn split_fields(line: &str, count: usize) -> (Vec<&str>, &str) {
    let mut rest = line.trim_start();
    let mut fields = Vec::with_capacity(count);
    while fields.len() < count && !rest.is_empty() {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        fields.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    (fields, rest.trim_end())
}

fn render_details(pid: &str, ps_line: &str, files: &str) -> String {
    let (fields, command) = split_fields(ps_line, 7);
    let field = |i: usize| fields.get(i).copied().unwrap_or("");
    let (pid_field, user, cpu, mem, stat, start, time) =
        (field(0), field(1), field(2), field(3), field(4), field(5), field(6));
    let command: String = command.chars().take(MAX_COMMAND_WIDTH).collect();

    let heavy = "═".repeat(67);
    let light = "─".repeat(67);
    format!(
        "\n{heavy}\n  PROCESS DETAILS (PID: {pid})\n{heavy}\n\n  \
         PID      {pid_field}\n  User     {user}\n  CPU      {cpu}\n  Memory   {mem}\n  \
         State    {stat}\n  Started  {start}\n  Time     {time}\n\n  Command:\n    {command}\n\n\
         {light}\n  Open files/ports (first {MAX_OPEN_FILES}):\n{files}\n\n{heavy}\n"
    )
}

fn show_details(selection: &str) -> Result<()> {
    let Some(pid) = pid_of(selection) else {
        return Ok(());
    };

    let Some(ps_line) = capture(
        "ps",
        &["-p", pid, "-o", "pid=,user=,%cpu=,%mem=,stat=,start=,time=,command="],
    )?
    else {
        println!("Process {pid} not found");
        return wait_for_enter();
    };

    let files = match capture("lsof", &["-p", pid]) {
        Ok(Some(lsof)) => open_files(&lsof),
        Ok(None) | Err(FzfuiError::ToolNotFound(_)) => "        (permission denied)".to_string(),
        Err(e) => return Err(e),
    };

    print!("\x1b[2J\x1b[H{}", render_details(pid, &ps_line, &files));
    wait_for_enter()
}

fn kill_process(selection: &str) -> Result<()> {
    let Some(pid) = pid_of(selection)
        .and_then(|pid| pid.parse::<libc::pid_t>().ok())
        .filter(|&pid| pid > 0)
    else {
        return Ok(());
    };
    if unsafe { libc::kill(pid, libc::SIGKILL) } == 0 {
        tracing::debug!(pid, "sent SIGKILL");
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::ESRCH) {
        tracing::debug!(pid, "process already exited");
        return Ok(());
    }
    Err(FzfuiError::Io(err))
}

fn build(args: &[OsString]) -> Result<App> {
    let mut app = App::new("psi")?;
    let columns = columns_from(args, app.arg(COLUMNS_ARG));

    app.about("Interactive process viewer")
        .option(COLUMNS_ARG, "Extra columns for --listening (cpu,mem,stat,time)");
    register_filters(&mut app, &columns);

    let toggle_listening = wrap("transform", &app.hidden_invocation(TOGGLE_LISTENING, "")?)?;
    let toggle_columns = wrap("transform", &app.hidden_invocation(TOGGLE_COLUMNS, "")?)?;

    app.main(
        FinderOptions::new(ps_command(&[]))
            .header_lines(1)
            .with_nth("2..")
            .fzf_option("--footer")
            .fzf_option(ps_footer(&[]))
            .bind("ctrl-l", toggle_listening)
            .bind("ctrl-o", toggle_columns),
    );

    app.command(TOGGLE_LISTENING, |app, _| {
        let current = app.current_filter();
        let (first, second) = listening_pair(current.as_deref());
        app.toggle_filter(first, second).map(Some)
    })
    .command(TOGGLE_COLUMNS, |app, _| {
        let target = toggled_columns(app.current_filter().as_deref());
        app.select_filter(&target).map(Some)
    })
    .action(
        "detail",
        Action::new("enter", |_, pid| show_details(pid))
            .description("Show process details")
            .field(1),
    )
    .action(
        "kill",
        Action::new("ctrl-k", |_, pid| kill_process(pid))
            .description("Kill process (SIGKILL)")
            .reload()
            .silent()
            .field(1),
    )
    .action(
        "reload",
        Action::new("ctrl-r", |_, _| Ok(()))
            .description("Reload process list")
            .reload()
            .silent(),
    )
    .preview(|app, _| {
        Ok(app.help_text(&[
            ("ctrl-l", "Toggle listening-only filter"),
            ("ctrl-o", "Toggle extra columns (cpu,mem,stat,time)"),
        ]))
    });

    Ok(app)
}

fn main() {
    let args: Vec<OsString> = std::env::args_os().collect();
    let mut app = match build(&args) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("[psi] {e}");
            std::process::exit(e.exit_code());
        }
    };
    std::process::exit(app.run());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_keep_display_order_and_drop_unknown() {
        assert_eq!(parse_columns("time, cpu,bogus"), vec!["cpu", "time"]);
        assert!(parse_columns("").is_empty());
    }

    #[test]
    fn columns_from_flag_forms() {
        let args: Vec<OsString> = ["psi", "--columns", "mem"].iter().map(OsString::from).collect();
        assert_eq!(columns_from(&args, None), vec!["mem"]);

        let args: Vec<OsString> = ["psi", "--columns=stat,cpu"].iter().map(OsString::from).collect();
        assert_eq!(columns_from(&args, None), vec!["cpu", "stat"]);

        let args: Vec<OsString> = ["psi", "_reload"].iter().map(OsString::from).collect();
        assert_eq!(columns_from(&args, Some("time")), vec!["time"]);
    }

    #[test]
    fn ps_command_projects_requested_columns() {
        let minimal = ps_command(&[]);
        assert!(minimal.contains("print $1, \"PORTS\", \"CWD\", \"COMMAND\""));
        assert!(minimal.contains("print $1, p, c, cmd"));

        let full = ps_command(&["cpu", "time"]);
        assert!(full.contains("print $1, \"PORTS\", $2, $5, \"CWD\", \"COMMAND\""));
        assert!(full.contains("print $1, p, $2, $5, c, cmd"));
    }

    #[test]
    fn listening_command_filters_on_ports() {
        assert!(listening_command(&[]).ends_with("column -t -s $'\\t' | awk 'NR==1 || $2!=\"-\"'"));
    }

    #[test]
    fn footer_names_columns() {
        assert_eq!(ps_footer(&[]), "ps -U $USER -o pid,command");
        assert_eq!(
            ps_footer(&OPTIONAL_COLUMNS),
            "ps -U $USER -o pid,%cpu,%mem,stat,time,command"
        );
    }

    #[test]
    fn filter_toggles_keep_the_other_dimension() {
        assert_eq!(listening_pair(None), ("all", "listening"));
        assert_eq!(listening_pair(Some("listening-full")), ("all-full", "listening-full"));
        assert_eq!(toggled_columns(None), "all-full");
        assert_eq!(toggled_columns(Some("listening")), "listening-full");
        assert_eq!(toggled_columns(Some("all-full")), "all");
    }

    #[test]
    fn pid_must_be_numeric() {
        assert_eq!(pid_of(" 123 "), Some("123"));
        assert_eq!(pid_of("PID"), None);
        assert_eq!(pid_of(""), None);
    }

    #[test]
    fn kill_terminates_the_selected_process() {
        use std::os::unix::process::ExitStatusExt;

        let mut child = Command::new("sleep").arg("30").spawn().unwrap();
        kill_process(&format!("{}\n", child.id())).unwrap();
        assert_eq!(child.wait().unwrap().signal(), Some(libc::SIGKILL));
    }

    #[test]
    fn kill_ignores_missing_and_invalid_pids() {
        assert!(kill_process("2147483647").is_ok());
        assert!(kill_process("99999999999").is_ok());
        assert!(kill_process("0").is_ok());
        assert!(kill_process("PID").is_ok());
    }

    #[test]
    fn open_files_skips_header_and_short_rows() {
        let lsof = "COMMAND PID USER FD TYPE DEVICE SIZE NODE NAME\n\
                    bash 1 me cwd DIR 1,4 640 2 /home/me\n\
                    short row\n";
        assert_eq!(open_files(lsof), "        DIR        /home/me");
        assert_eq!(open_files("HEADER\n"), "        (none)");
    }

    #[test]
    fn fields_split_on_runs_of_spaces() {
        let (fields, rest) = split_fields("  42 me   0.0 bash -c 'a  b'\n", 3);
        assert_eq!(fields, vec!["42", "me", "0.0"]);
        assert_eq!(rest, "bash -c 'a  b'");
    }

    #[test]
    fn details_truncate_long_commands() {
        let line = format!("42 me 0.0 0.1 S 10:00 0:00.01 {}", "x".repeat(100));
        let text = render_details("42", &line, "        (none)");
        assert!(text.contains("PROCESS DETAILS (PID: 42)"));
        assert!(text.contains("  User     me\n"));
        assert!(text.contains(&format!("    {}\n", "x".repeat(MAX_COMMAND_WIDTH))));
        assert!(!text.contains(&"x".repeat(MAX_COMMAND_WIDTH + 1)));
    }
}
