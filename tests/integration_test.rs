use mockall::predicate::eq;
use std::cell::RefCell;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use vox_assistant::dispatcher::Dispatcher;
use vox_assistant::ear::Listener;
use vox_assistant::engine::SpeechOutput;
use vox_assistant::knowledge::KnowledgeSource;
use vox_assistant::notes::NotesStore;
use vox_assistant::session::{Mode, Session};
use vox_assistant::web::{self, Browser};
use vox_assistant::Error;

mockall::mock! {
    pub Browser {}
    impl Browser for Browser {
        fn open(&self, url: &str) -> vox_assistant::Result<()>;
    }
}

mockall::mock! {
    pub Knowledge {}
    impl KnowledgeSource for Knowledge {
        fn summarize(&self, topic: &str, sentences: usize) -> Option<String>;
    }
}

mockall::mock! {
    pub Listener {}
    impl Listener for Listener {
        fn listen(&mut self) -> Option<String>;
    }
}

mockall::mock! {
    pub Speech {}
    impl SpeechOutput for Speech {
        fn speak(&self, text: &str);
    }
}

/// Keeps every reply so a test can inspect the whole conversation.
#[derive(Default)]
struct Transcript(RefCell<Vec<String>>);

impl SpeechOutput for Transcript {
    fn speak(&self, text: &str) {
        self.0.borrow_mut().push(text.to_string());
    }
}

impl Transcript {
    fn lines(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    fn said(&self, needle: &str) -> bool {
        self.0.borrow().iter().any(|line| line.contains(needle))
    }
}

fn no_browser() -> MockBrowser {
    let mut browser = MockBrowser::new();
    browser.expect_open().times(0);
    browser
}

fn no_knowledge() -> MockKnowledge {
    let mut knowledge = MockKnowledge::new();
    knowledge.expect_summarize().times(0);
    knowledge
}

fn wake_phrases() -> Vec<String> {
    vec!["hey jarvis".into(), "ok jarvis".into(), "jarvis".into()]
}

fn no_voice() -> vox_assistant::session::ListenerFactory<'static> {
    Box::new(|| Err(Error::Audio("no microphone".to_string())))
}

fn voice(replies: &[&str]) -> vox_assistant::session::ListenerFactory<'static> {
    let replies: Vec<String> = replies.iter().map(|r| r.to_string()).collect();
    Box::new(move || {
        let mut queue = replies.clone().into_iter();
        let mut listener = MockListener::new();
        listener.expect_listen().returning(move || queue.next());
        Ok(Box::new(listener) as Box<dyn Listener>)
    })
}

/// Runs a text session over `input` and returns the final mode.
fn run_text(
    input: &str,
    speech: &dyn SpeechOutput,
    browser: &dyn Browser,
    knowledge: &dyn KnowledgeSource,
    notes: &NotesStore,
) -> Mode {
    let dispatcher = Dispatcher::new(speech, browser, knowledge, notes, "Jarvis", 2);
    let mut session = Session::new(
        Mode::Text,
        dispatcher,
        speech,
        wake_phrases(),
        Cursor::new(input.to_string()),
        no_voice(),
    );
    session.run().expect("session");
    session.mode()
}

fn scratch_notes() -> (tempfile::TempDir, NotesStore) {
    let dir = tempfile::tempdir().unwrap();
    let notes = NotesStore::new(dir.path().join("notes.txt"));
    (dir, notes)
}

#[test]
fn exit_keyword_wins_over_lookup() {
    let (_dir, notes) = scratch_notes();
    let speech = Transcript::default();

    // the second line is never read
    run_text(
        "tell me about exit strategies\nsearch for cats\n",
        &speech,
        &no_browser(),
        &no_knowledge(),
        &notes,
    );

    assert_eq!(speech.lines(), vec!["Goodbye! Have a great day."]);
}

#[test]
fn both_search_prefixes_search_for_the_remainder() {
    let (_dir, notes) = scratch_notes();
    let mut browser = MockBrowser::new();
    browser
        .expect_open()
        .with(eq("https://www.google.com/search?q=cats"))
        .times(2)
        .returning(|_| Ok(()));

    run_text(
        "search for cats\ngoogle cats\n",
        &Transcript::default(),
        &browser,
        &no_knowledge(),
        &notes,
    );
}

#[test]
fn both_video_prefixes_search_youtube() {
    let (_dir, notes) = scratch_notes();
    let mut browser = MockBrowser::new();
    browser
        .expect_open()
        .with(eq("https://www.youtube.com/results?search_query=lofi+beats"))
        .times(2)
        .returning(|_| Ok(()));

    run_text(
        "play lofi beats\nYouTube lofi beats\n",
        &Transcript::default(),
        &browser,
        &no_knowledge(),
        &notes,
    );
}

#[test]
fn notes_are_appended_in_order() {
    let (dir, notes) = scratch_notes();
    let speech = Transcript::default();

    run_text(
        "note buy milk\nnote buy milk\ntake note call mom\n",
        &speech,
        &no_browser(),
        &no_knowledge(),
        &notes,
    );

    let content = std::fs::read_to_string(dir.path().join("notes.txt")).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with('['));
    assert!(lines[0].ends_with("] buy milk"));
    assert!(lines[1].ends_with("] buy milk"));
    assert!(lines[2].ends_with("] note call mom"));
    assert!(speech.said("Noted. Saved to"));
}

#[test]
fn lookup_speaks_summary() {
    let (_dir, notes) = scratch_notes();
    let mut knowledge = MockKnowledge::new();
    knowledge
        .expect_summarize()
        .with(eq("the eiffel tower"), eq(2))
        .times(1)
        .returning(|_, _| Some("The Eiffel Tower is a lattice tower in Paris.".to_string()));
    let speech = Transcript::default();

    run_text("What is the Eiffel Tower?\n", &speech, &no_browser(), &knowledge, &notes);

    assert!(speech.said("The Eiffel Tower is a lattice tower in Paris."));
}

#[test]
fn lookup_miss_searches_the_web() {
    let (_dir, notes) = scratch_notes();
    let mut knowledge = MockKnowledge::new();
    knowledge
        .expect_summarize()
        .with(eq("the eiffel tower"), eq(2))
        .times(1)
        .returning(|_, _| None);
    let mut browser = MockBrowser::new();
    browser
        .expect_open()
        .with(eq("https://www.google.com/search?q=the+eiffel+tower"))
        .times(1)
        .returning(|_| Ok(()));

    run_text(
        "what is the eiffel tower\n",
        &Transcript::default(),
        &browser,
        &knowledge,
        &notes,
    );
}

#[test]
fn repeated_commands_repeat_side_effects() {
    let (_dir, notes) = scratch_notes();
    let mut browser = MockBrowser::new();
    browser
        .expect_open()
        .with(eq(web::YOUTUBE_URL))
        .times(3)
        .returning(|_| Ok(()));

    let mode = run_text(
        "open youtube\nopen youtube\nplease open youtube\n",
        &Transcript::default(),
        &browser,
        &no_knowledge(),
        &notes,
    );
    assert_eq!(mode, Mode::Text);
}

#[test]
fn browser_failure_is_reported_and_session_continues() {
    let (_dir, notes) = scratch_notes();
    let mut browser = MockBrowser::new();
    browser
        .expect_open()
        .times(1)
        .returning(|_| Err(Error::Browser("no opener".to_string())));
    let speech = Transcript::default();

    run_text("open github\nhello\n", &speech, &browser, &no_knowledge(), &notes);

    assert!(speech.said("Sorry, I couldn't do that"));
    assert!(speech.said("How can I help you?"));
}

#[test]
fn bare_wake_phrase_in_text_mode_is_acknowledged() {
    let (_dir, notes) = scratch_notes();
    let mut speech = MockSpeech::new();
    speech
        .expect_speak()
        .with(eq("I'm listening."))
        .times(1)
        .return_const(());

    run_text("Jarvis\n\n   \n", &speech, &no_browser(), &no_knowledge(), &notes);
}

#[test]
fn voice_commands_need_a_wake_phrase() {
    let (_dir, notes) = scratch_notes();
    let speech = Transcript::default();
    let mut browser = MockBrowser::new();
    browser
        .expect_open()
        .with(eq(web::GITHUB_URL))
        .times(1)
        .returning(|_| Ok(()));
    let knowledge = no_knowledge();

    let dispatcher = Dispatcher::new(&speech, &browser, &knowledge, &notes, "Jarvis", 2);
    let mut session = Session::new(
        Mode::Voice,
        dispatcher,
        &speech,
        wake_phrases(),
        Cursor::new(String::new()),
        voice(&[
            "what time is it",
            "hey jarvis",
            "hey jarvis, open github",
            "jarvis goodbye",
        ]),
    );
    session.run().unwrap();

    assert!(!speech.said("The time is"));
    assert_eq!(
        speech.lines(),
        vec!["Yes?", "Opening GitHub.", "Goodbye! Have a great day."]
    );
}

#[test]
fn wake_phrase_then_time_dispatches_the_command() {
    let (_dir, notes) = scratch_notes();
    let speech = Transcript::default();
    let browser = no_browser();
    let knowledge = no_knowledge();

    let dispatcher = Dispatcher::new(&speech, &browser, &knowledge, &notes, "Jarvis", 2);
    let mut session = Session::new(
        Mode::Voice,
        dispatcher,
        &speech,
        wake_phrases(),
        Cursor::new(String::new()),
        voice(&["hey jarvis what time is it", "hey jarvis bye"]),
    );
    session.run().unwrap();

    assert!(speech.lines()[0].starts_with("The time is "));
}

#[test]
fn missing_voice_falls_back_to_text() {
    let (_dir, notes) = scratch_notes();
    let speech = Transcript::default();
    let browser = no_browser();
    let knowledge = no_knowledge();
    let attempts = AtomicUsize::new(0);

    let dispatcher = Dispatcher::new(&speech, &browser, &knowledge, &notes, "Jarvis", 2);
    let mut session = Session::new(
        Mode::Voice,
        dispatcher,
        &speech,
        wake_phrases(),
        Cursor::new("hello\nswitch voice\n".to_string()),
        Box::new(|| {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(Error::Audio("no microphone".to_string()))
        }),
    );
    session.run().unwrap();

    assert_eq!(session.mode(), Mode::Text);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(
        speech.lines(),
        vec![
            "Voice input is unavailable, so I'll continue in text mode.",
            "Hello! How can I help you?",
            "Switched to voice mode.",
            "Voice input is unavailable, so I'll continue in text mode.",
        ]
    );
}

#[test]
fn switching_modes_round_trip() {
    let (_dir, notes) = scratch_notes();
    let speech = Transcript::default();
    let browser = no_browser();
    let knowledge = no_knowledge();

    let dispatcher = Dispatcher::new(&speech, &browser, &knowledge, &notes, "Jarvis", 2);
    let mut session = Session::new(
        Mode::Text,
        dispatcher,
        &speech,
        wake_phrases(),
        Cursor::new("mode voice\nhi jarvis\n".to_string()),
        voice(&["", "jarvis switch text"]),
    );
    session.run().unwrap();

    assert_eq!(session.mode(), Mode::Text);
    assert_eq!(
        speech.lines(),
        vec![
            "Switched to voice mode.",
            "Switched to text mode.",
            "Hello! How can I help you?",
        ]
    );
}
