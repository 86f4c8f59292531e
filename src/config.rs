use std::path::Path;

use log::{info, warn};

use crate::{Address, RouterState};

/// Load startup commands into the router state before the protocol tasks
/// begin. Each non-empty, non-comment line must read `add <address> <cost>`.
/// Malformed lines and a missing file are reported and skipped, never fatal.
pub fn load_startup_commands(state: &mut RouterState, path: &Path) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!("could not read startup file {}: {e}", path.display());
            return;
        }
    };

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match parse_add_line(line) {
            Some((addr, cost)) => state.add_neighbor(addr, cost),
            None => warn!("skipping invalid startup line: '{line}'"),
        }
    }

    info!(
        "loaded {} neighbors from {}",
        state.neighbors.len(),
        path.display()
    );
}

fn parse_add_line(line: &str) -> Option<(Address, u32)> {
    let mut parts = line.split_whitespace();
    if parts.next()? != "add" {
        return None;
    }
    let addr = parts.next()?.parse().ok()?;
    let cost = parts.next()?.parse().ok()?;
    Some((addr, cost))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn parses_well_formed_add_lines() {
        let (addr, cost) = parse_add_line("add 10.0.0.2 5").unwrap();
        assert_eq!(addr, "10.0.0.2".parse::<Address>().unwrap());
        assert_eq!(cost, 5);
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(parse_add_line("del 10.0.0.2").is_none());
        assert!(parse_add_line("add 10.0.0.2").is_none());
        assert!(parse_add_line("add not-an-address 5").is_none());
        assert!(parse_add_line("add 10.0.0.2 many").is_none());
    }

    #[test]
    fn loads_commands_and_skips_bad_lines() {
        let dir = std::env::temp_dir();
        let path = dir.join("dv-router-startup-test.txt");
        std::fs::write(
            &path,
            "# neighbors\nadd 10.0.0.2 1\n\nbogus line\nadd 10.0.0.3 4\n",
        )
        .unwrap();

        let mut state = RouterState::new("10.0.0.1".parse().unwrap(), Duration::from_secs(5));
        load_startup_commands(&mut state, &path);
        std::fs::remove_file(&path).ok();

        assert_eq!(state.neighbors.len(), 2);
        assert_eq!(
            state
                .table
                .get(&"10.0.0.3".parse::<Address>().unwrap())
                .unwrap()
                .distance,
            4
        );
    }

    #[test]
    fn missing_file_is_not_fatal() {
        let mut state = RouterState::new("10.0.0.1".parse().unwrap(), Duration::from_secs(5));
        load_startup_commands(&mut state, Path::new("/nonexistent/startup.txt"));
        assert!(state.neighbors.is_empty());
    }
}
