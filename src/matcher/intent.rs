//! Intent Rule Matcher
//!
//! An ordered list of (pattern, function name) rules evaluated top to
//! bottom against the lowercased prompt; the first substring match wins.
//! Order is a priority mechanism: memory and directory phrasings must be
//! checked before the generic "calc" rule, or "calculate memory" would
//! mis-route to the calculator.

use regex::Regex;
use tracing::debug;

/// (pattern, target function short name), highest priority first.
const INTENT_RULES: [(&str, &str); 25] = [
    // Memory
    (r"(show|display|get).*memory", "get_memory_usage"),
    (r"memory.*usage", "get_memory_usage"),
    (r"(usage|space|available).*(memory|ram)", "get_memory_usage"),
    (r"(memory|ram).*(usage|info|stat)", "get_memory_usage"),
    // Directory listing
    (r"(list|show).*directory", "list_directory_contents"),
    (r"(list|show).*folder", "list_directory_contents"),
    (r"(list|show).*file", "list_directory_contents"),
    (r"directory.*content", "list_directory_contents"),
    (r"(show|list|display).*content", "list_directory_contents"),
    // Calculator, after memory and directory
    (r"(open|launch|start|run).*(calc|calculator)", "open_calculator"),
    // Chrome
    (r"(open|launch|start).*chrome", "open_chrome"),
    (r"browse|browser|web", "open_chrome"),
    // Notepad
    (r"(open|launch|start).*note", "open_notepad"),
    (r"text editor|notepad", "open_notepad"),
    // CPU usage
    (r"(cpu|processor).*usage", "get_cpu_usage"),
    (r"(usage|load|utilization).*(cpu|processor)", "get_cpu_usage"),
    (r"(show|display|get|what).*(cpu|processor)", "get_cpu_usage"),
    // Disk
    (r"(disk|storage|drive).*usage", "get_disk_usage"),
    (r"(usage|available|space).*(disk|storage|drive)", "get_disk_usage"),
    (r"(show|display|get).*(disk|storage|drive)", "get_disk_usage"),
    // Process list
    (r"(process|running|task).*list", "list_running_processes"),
    (r"list.*(process|running|task)", "list_running_processes"),
    (r"(show|display|get).*(process|running|task)", "list_running_processes"),
    // Command execution
    (r"run command|execute command|shell command", "run_command"),
    // Create directory
    (r"create.*dir|create.*folder|create.*directory", "create_directory"),
];

pub struct IntentMatcher {
    rules: Vec<(Regex, &'static str)>,
}

impl IntentMatcher {
    pub fn new() -> Self {
        let rules = INTENT_RULES
            .iter()
            .map(|(pattern, function)| {
                let regex = Regex::new(pattern)
                    .unwrap_or_else(|e| panic!("invalid intent pattern '{}': {}", pattern, e));
                (regex, *function)
            })
            .collect();
        Self { rules }
    }

    /// Return the short name of the first rule matching the prompt, if any.
    pub fn matches(&self, prompt: &str) -> Option<&'static str> {
        let prompt = prompt.to_lowercase();
        for (pattern, function) in &self.rules {
            if pattern.is_match(&prompt) {
                debug!(function, pattern = pattern.as_str(), "intent match");
                return Some(function);
            }
        }
        debug!(prompt = %prompt, "no intent match");
        None
    }
}

impl Default for IntentMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_phrasings_route_to_cpu_usage() {
        let matcher = IntentMatcher::new();
        assert_eq!(
            matcher.matches("What's the current CPU usage?"),
            Some("get_cpu_usage")
        );
        assert_eq!(matcher.matches("show processor load"), Some("get_cpu_usage"));
    }

    #[test]
    fn memory_rules_outrank_the_calc_rule() {
        let matcher = IntentMatcher::new();
        // "calculate memory" contains "calc" but must route to memory.
        assert_eq!(
            matcher.matches("calculate memory usage"),
            Some("get_memory_usage")
        );
        assert_eq!(matcher.matches("memory usage"), Some("get_memory_usage"));
    }

    #[test]
    fn directory_rules_outrank_the_calc_rule() {
        let matcher = IntentMatcher::new();
        assert_eq!(
            matcher.matches("show directory contents"),
            Some("list_directory_contents")
        );
    }

    #[test]
    fn calculator_still_matches_on_its_own() {
        let matcher = IntentMatcher::new();
        assert_eq!(
            matcher.matches("open the calculator"),
            Some("open_calculator")
        );
    }

    #[test]
    fn unrelated_prompts_miss() {
        let matcher = IntentMatcher::new();
        assert_eq!(matcher.matches("compose a haiku"), None);
    }
}
