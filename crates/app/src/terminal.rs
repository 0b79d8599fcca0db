//! Plain-text rendering and the interactive quiz prompt.

use std::io::{self, BufRead, Write};

use cardak_core::model::{ForumPost, OptionId, Photo, Question, QuestionKind, Response, TestId};
use cardak_core::scoring::{ScoreReport, Verdict};
use services::{QuizLoopService, QuizSession};
use storage::repository::TestListing;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn print_tests(out: &mut impl Write, tests: &[TestListing]) -> io::Result<()> {
    if tests.is_empty() {
        return writeln!(out, "No tests yet.");
    }
    for test in tests {
        writeln!(
            out,
            "#{:<4} {} ({} questions, by {}, {})",
            test.id,
            test.title,
            test.question_count,
            test.created_by,
            test.created_at.format(DATE_FORMAT)
        )?;
        if !test.description.is_empty() {
            writeln!(out, "      {}", test.description)?;
        }
    }
    Ok(())
}

pub fn print_posts(out: &mut impl Write, posts: &[ForumPost]) -> io::Result<()> {
    if posts.is_empty() {
        return writeln!(out, "The forum is quiet.");
    }
    for post in posts {
        writeln!(
            out,
            "[{}] {}: {}",
            post.created_at.format(DATE_FORMAT),
            post.username,
            post.content
        )?;
    }
    Ok(())
}

pub fn print_photos(out: &mut impl Write, photos: &[Photo]) -> io::Result<()> {
    if photos.is_empty() {
        return writeln!(out, "No photos yet.");
    }
    for photo in photos {
        writeln!(
            out,
            "#{:<4} {} by {} ({} likes)\n      {}",
            photo.id, photo.title, photo.uploaded_by, photo.likes, photo.url
        )?;
    }
    Ok(())
}

//
// ─── QUIZ PROMPT ───────────────────────────────────────────────────────────────
//

/// One line of user input while a question is on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Next,
    Back,
    Quit,
    Answer(Response),
    Invalid(String),
}

fn parse_input(line: &str, question: &Question) -> Input {
    let line = line.trim();
    match line {
        "" => return Input::Next,
        ":b" => return Input::Back,
        ":q" => return Input::Quit,
        _ => {}
    }

    match question.kind() {
        QuestionKind::OpenEnded => Input::Answer(Response::Text(line.to_owned())),
        QuestionKind::MultipleChoice | QuestionKind::ImageBased => {
            let picked = line
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| question.options().get(i));
            match picked {
                Some(option) => Input::Answer(Response::Choice(option.id())),
                None => Input::Invalid(format!(
                    "pick a number between 1 and {}",
                    question.options().len()
                )),
            }
        }
    }
}

fn render_question(out: &mut impl Write, session: &QuizSession) -> io::Result<()> {
    let Some(question) = session.current_question() else {
        return Ok(());
    };
    let progress = session.progress();
    writeln!(out)?;
    writeln!(out, "[{}/{}] {}", progress.position(), progress.total, question.text())?;
    if let Some(url) = question.image_url() {
        writeln!(out, "  image: {url}")?;
    }

    let answer = session.answer_for(question.id());
    let selected: Option<OptionId> = answer.and_then(|a| a.selected_option_id());
    for (i, option) in question.options().iter().enumerate() {
        let mark = if selected == Some(option.id()) { '*' } else { ' ' };
        writeln!(out, " {mark} {}) {}", i + 1, option.text())?;
    }
    if let Some(text) = answer.and_then(|a| a.open_text()) {
        writeln!(out, "  your answer: {text}")?;
    }

    let hint = if question.kind().has_options() {
        "number to answer"
    } else {
        "type your answer"
    };
    write!(out, "({hint}, Enter = next, :b = back, :q = quit) > ")?;
    out.flush()
}

fn render_report(out: &mut impl Write, session: &QuizSession, report: &ScoreReport) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "Score: {} ({}/{} correct)", report.score, report.correct, report.scoreable)?;
    for (i, question) in session.test().questions().iter().enumerate() {
        let verdict = report.verdict_for(question.id());
        let label = match verdict {
            Some(Verdict::Correct) => "correct",
            Some(Verdict::Incorrect) => "wrong",
            Some(Verdict::Unanswered) => "unanswered",
            Some(Verdict::NotScored) | None => "not scored",
        };
        writeln!(out, "  {}. {} [{label}]", i + 1, question.text())?;
        let missed = matches!(verdict, Some(Verdict::Incorrect | Verdict::Unanswered));
        match question.correct_option() {
            Some(correct) if missed => writeln!(out, "     answer: {}", correct.text())?,
            _ => {}
        }
    }
    Ok(())
}

/// Walk the user through a test on stdin/stdout and save the result.
///
/// # Errors
///
/// Returns an error if the test cannot be loaded or the terminal fails.
/// A failed save is retried once and then reported without aborting.
pub async fn take_test(
    quiz: &QuizLoopService,
    test_id: TestId,
    input: &mut impl BufRead,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = quiz.start_session(test_id).await?;
    writeln!(out, "{}", session.test().title())?;

    while !session.is_complete() {
        render_question(out, &session)?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(out)?;
            return Ok(());
        }
        let Some(question) = session.current_question() else {
            break;
        };

        match parse_input(&line, question) {
            Input::Quit => return Ok(()),
            Input::Back => {
                session.retreat()?;
            }
            Input::Invalid(hint) => writeln!(out, "  {hint}")?,
            Input::Answer(response) => {
                session.answer_current(response)?;
                step(quiz, &mut session, out).await?;
            }
            Input::Next => step(quiz, &mut session, out).await?,
        }
    }

    if let Some(report) = session.report() {
        render_report(out, &session, report)?;
    }
    Ok(())
}

async fn step(
    quiz: &QuizLoopService,
    session: &mut QuizSession,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(err) = quiz.advance(session).await {
        if !session.is_complete() {
            return Err(err.into());
        }
        tracing::warn!(error = %err, "saving result failed, retrying");
        if let Err(err) = quiz.finalize_result(session).await {
            writeln!(out, "  could not save your result: {err}")?;
        }
    }
    Ok(())
}
