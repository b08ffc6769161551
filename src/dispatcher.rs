//! Command dispatch.
//!
//! A command is matched against [`RULES`] in order and the first rule whose
//! predicate holds runs its action. There is no scoring or backtracking, so the
//! order of the table is the priority: mode switches, then exit keywords, then
//! everything else, with a web search as the catch-all.

use crate::clock;
use crate::engine::SpeechOutput;
use crate::knowledge::KnowledgeSource;
use crate::notes::NotesStore;
use crate::session::Mode;
use crate::web::{self, Browser};
use crate::Result;

const VOICE_SWITCHES: &[&str] = &["mode voice", "switch voice"];
const TEXT_SWITCHES: &[&str] = &["mode text", "switch text"];
const EXIT_WORDS: &[&str] = &["quit", "exit", "stop", "goodbye", "bye"];
const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "hello there",
    "good morning",
    "good afternoon",
    "good evening",
];
/// Greetings that may be followed by the assistant's name ("hi jarvis").
const NAMED_GREETINGS: &[&str] = &["hello", "hi", "hey"];
const SITES: &[(&str, &str, &str)] = &[
    ("open youtube", web::YOUTUBE_URL, "YouTube"),
    ("open google", web::GOOGLE_URL, "Google"),
    ("open github", web::GITHUB_URL, "GitHub"),
];
const SEARCH_PREFIXES: &[&str] = &["search for ", "google "];
const VIDEO_PREFIXES: &[&str] = &["play ", "youtube "];
const NOTE_PREFIXES: &[&str] = &["note ", "take note ", "remember "];
const LOOKUP_PREFIXES: &[&str] = &["what is ", "who is ", "tell me about "];

/// What the session should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    SwitchMode(Mode),
    Exit,
}

impl Outcome {
    pub fn keeps_running(self) -> bool {
        !matches!(self, Outcome::Exit)
    }
}

/// One row of the rule table.
struct Rule {
    name: &'static str,
    matches: fn(&Dispatcher<'_>, &str) -> bool,
    action: fn(&Dispatcher<'_>, &str) -> Result<Outcome>,
}

const RULES: &[Rule] = &[
    Rule {
        name: "switch-voice",
        matches: |_, c| VOICE_SWITCHES.contains(&c),
        action: |d, _| d.switch_mode(Mode::Voice),
    },
    Rule {
        name: "switch-text",
        matches: |_, c| TEXT_SWITCHES.contains(&c),
        action: |d, _| d.switch_mode(Mode::Text),
    },
    Rule {
        name: "exit",
        matches: |_, c| EXIT_WORDS.iter().any(|w| c.contains(w)),
        action: |d, _| d.farewell(),
    },
    Rule {
        name: "greeting",
        matches: |d, c| d.is_greeting(c),
        action: |d, _| d.greet(),
    },
    Rule {
        name: "time",
        matches: |_, c| c.contains("time"),
        action: |d, _| d.report_time(),
    },
    Rule {
        name: "date",
        matches: |_, c| c.contains("date") || c.contains("day today"),
        action: |d, _| d.report_date(),
    },
    Rule {
        name: "open-site",
        matches: |_, c| SITES.iter().any(|(trigger, _, _)| c.contains(trigger)),
        action: |d, c| d.open_site(c),
    },
    Rule {
        name: "web-search",
        matches: |_, c| strip_any_prefix(c, SEARCH_PREFIXES).is_some(),
        action: |d, c| d.web_search(strip_any_prefix(c, SEARCH_PREFIXES).unwrap_or_default()),
    },
    Rule {
        name: "video-search",
        matches: |_, c| strip_any_prefix(c, VIDEO_PREFIXES).is_some(),
        action: |d, c| d.video_search(strip_any_prefix(c, VIDEO_PREFIXES).unwrap_or_default()),
    },
    Rule {
        name: "note",
        matches: |_, c| strip_any_prefix(c, NOTE_PREFIXES).is_some(),
        action: |d, c| d.take_note(after_first_space(c)),
    },
    Rule {
        name: "lookup",
        matches: |_, c| strip_any_prefix(c, LOOKUP_PREFIXES).is_some(),
        action: |d, c| d.look_up(strip_any_prefix(c, LOOKUP_PREFIXES).unwrap_or_default()),
    },
    Rule {
        name: "fallback-search",
        matches: |_, _| true,
        action: |d, c| d.fallback(c),
    },
];

/// Returns the trimmed remainder after the first matching prefix.
///
/// A command equal to a prefix without its trailing space ("search for")
/// matches with an empty remainder, so the rule can ask for the missing part
/// instead of the command falling through to a search for the trigger words.
fn strip_any_prefix<'c>(command: &'c str, prefixes: &[&str]) -> Option<&'c str> {
    prefixes.iter().find_map(|prefix| {
        if command == prefix.trim_end() {
            Some("")
        } else {
            command.strip_prefix(prefix).map(str::trim)
        }
    })
}

/// Everything after the first space, so "take note call mom" keeps "note call mom".
fn after_first_space(command: &str) -> &str {
    command.split_once(' ').map_or("", |(_, rest)| rest.trim())
}

pub struct Dispatcher<'a> {
    speech: &'a dyn SpeechOutput,
    browser: &'a dyn Browser,
    knowledge: &'a dyn KnowledgeSource,
    notes: &'a NotesStore,
    name: String,
    summary_sentences: usize,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        speech: &'a dyn SpeechOutput,
        browser: &'a dyn Browser,
        knowledge: &'a dyn KnowledgeSource,
        notes: &'a NotesStore,
        name: &str,
        summary_sentences: usize,
    ) -> Self {
        Self {
            speech,
            browser,
            knowledge,
            notes,
            name: name.to_lowercase(),
            summary_sentences: summary_sentences.max(1),
        }
    }

    /// Name of the rule `command` would trigger.
    pub fn rule_for(&self, command: &str) -> &'static str {
        self.find(command).name
    }

    fn find(&self, command: &str) -> &'static Rule {
        RULES
            .iter()
            .find(|rule| (rule.matches)(self, command))
            .unwrap_or(&RULES[RULES.len() - 1])
    }

    /// Runs the first matching rule. Failed side effects are reported to the
    /// user and never end the session.
    pub fn dispatch(&self, command: &str) -> Outcome {
        let rule = self.find(command);
        tracing::debug!(rule = rule.name, %command, "dispatching");
        match (rule.action)(self, command) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(rule = rule.name, error = %e, "command failed");
                self.speech.speak(&format!("Sorry, I couldn't do that: {}", e));
                Outcome::Continue
            }
        }
    }

    fn is_greeting(&self, command: &str) -> bool {
        if GREETINGS.contains(&command) {
            return true;
        }
        NAMED_GREETINGS.iter().any(|greeting| {
            command
                .strip_prefix(greeting)
                .and_then(|rest| rest.strip_prefix(' '))
                .is_some_and(|rest| rest == self.name)
        })
    }

    fn switch_mode(&self, mode: Mode) -> Result<Outcome> {
        self.speech.speak(&format!("Switched to {} mode.", mode));
        Ok(Outcome::SwitchMode(mode))
    }

    fn farewell(&self) -> Result<Outcome> {
        self.speech.speak("Goodbye! Have a great day.");
        Ok(Outcome::Exit)
    }

    fn greet(&self) -> Result<Outcome> {
        self.speech.speak("Hello! How can I help you?");
        Ok(Outcome::Continue)
    }

    fn report_time(&self) -> Result<Outcome> {
        self.speech
            .speak(&format!("The time is {}.", clock::current_time()));
        Ok(Outcome::Continue)
    }

    fn report_date(&self) -> Result<Outcome> {
        self.speech
            .speak(&format!("Today is {}.", clock::current_date()));
        Ok(Outcome::Continue)
    }

    fn open_site(&self, command: &str) -> Result<Outcome> {
        if let Some((_, url, label)) = SITES.iter().find(|(trigger, _, _)| command.contains(trigger)) {
            self.speech.speak(&format!("Opening {}.", label));
            self.browser.open(url)?;
        }
        Ok(Outcome::Continue)
    }

    fn web_search(&self, query: &str) -> Result<Outcome> {
        if query.is_empty() {
            self.speech.speak("What should I search for?");
            return Ok(Outcome::Continue);
        }
        self.speech.speak(&format!("Searching the web for {}.", query));
        self.browser.open(&web::build_search_url(query))?;
        Ok(Outcome::Continue)
    }

    fn video_search(&self, query: &str) -> Result<Outcome> {
        if query.is_empty() {
            self.speech.speak("What should I play?");
            return Ok(Outcome::Continue);
        }
        self.speech.speak(&format!("Searching YouTube for {}.", query));
        self.browser.open(&web::build_video_search_url(query))?;
        Ok(Outcome::Continue)
    }

    fn take_note(&self, text: &str) -> Result<Outcome> {
        if text.is_empty() {
            self.speech.speak("What should I note down?");
            return Ok(Outcome::Continue);
        }
        let path = self.notes.append(text)?;
        self.speech
            .speak(&format!("Noted. Saved to {}.", path.display()));
        Ok(Outcome::Continue)
    }

    fn look_up(&self, topic: &str) -> Result<Outcome> {
        if topic.is_empty() {
            self.speech.speak("What would you like to know about?");
            return Ok(Outcome::Continue);
        }
        match self.knowledge.summarize(topic, self.summary_sentences) {
            Some(summary) => {
                self.speech.speak(&summary);
                Ok(Outcome::Continue)
            }
            None => {
                self.speech
                    .speak("I couldn't find a summary, so I'll search the web instead.");
                self.web_search(topic)
            }
        }
    }

    fn fallback(&self, command: &str) -> Result<Outcome> {
        if command.is_empty() {
            self.speech.speak("Sorry, I didn't catch that.");
            return Ok(Outcome::Continue);
        }
        self.speech
            .speak(&format!("I'm not sure how to do that, so I'll search the web for {}.", command));
        self.browser.open(&web::build_search_url(command))?;
        Ok(Outcome::Continue)
    }
}
