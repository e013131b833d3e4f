//! QuizPool entry point
//!
//! On the web the library's `web` module is the entry point; natively this is
//! a small command-line front end over a file-backed store.

#[cfg(not(target_arch = "wasm32"))]
mod cli {
    use std::io::{self, BufRead, Write};
    use std::path::PathBuf;
    use std::process::ExitCode;

    use clap::{Parser, Subcommand};
    use thiserror::Error;

    use quizpool::api::{ApiError, QuizClient};
    use quizpool::persistence::FileStorage;
    use quizpool::quiz::format_created_at;
    use quizpool::{
        Completion, Difficulty, Gamification, QuizPlayer, Settings, StorageError, StoredQuiz,
    };

    #[derive(Debug, Error)]
    enum CliError {
        #[error(transparent)]
        Storage(#[from] StorageError),

        #[error(transparent)]
        Api(#[from] ApiError),

        #[error("No quiz with id '{0}'")]
        UnknownQuiz(String),

        #[error("I/O error: {0}")]
        Io(#[from] io::Error),
    }

    #[derive(Parser)]
    #[command(name = "quizpool", version, about = "YouTube transcript quizzes with XP, levels and streaks")]
    struct Cli {
        /// Directory holding the quiz library and settings
        #[arg(long, env = "QUIZPOOL_DATA_DIR", global = true)]
        data_dir: Option<PathBuf>,

        #[command(subcommand)]
        command: Command,
    }

    #[derive(Subcommand)]
    enum Command {
        /// Show level, XP and streak
        Status,
        /// List saved quizzes, most recent first
        List,
        /// Print one quiz as JSON, or its transcript
        Show {
            id: String,
            /// Print the transcript preview instead of the JSON
            #[arg(long)]
            transcript: bool,
            /// Show up to 2000 characters instead of 320
            #[arg(long, requires = "transcript")]
            expanded: bool,
            /// Highlight case-insensitive matches in the transcript
            #[arg(long, requires = "transcript")]
            search: Option<String>,
        },
        /// Generate a quiz from a YouTube link and save it
        Generate {
            url: String,
            /// Number of questions (defaults to the saved setting)
            #[arg(short = 'n', long)]
            questions: Option<u32>,
            /// easy, medium or hard (defaults to the saved setting)
            #[arg(short, long, value_parser = Difficulty::parse)]
            difficulty: Option<Difficulty>,
        },
        /// Fetch the transcript of a video
        Transcript { video_id: String },
        /// Play a saved quiz interactively
        Play { id: String },
        /// Delete a saved quiz
        Remove { id: String },
        /// Add experience points
        Xp {
            #[arg(allow_negative_numbers = true)]
            points: i64,
        },
        /// Record a completed quiz for today
        Complete {
            #[arg(long, default_value_t = 0)]
            score: u32,
        },
        /// Show or change settings
        Settings {
            #[arg(long)]
            api_base: Option<String>,
            #[arg(short = 'n', long)]
            questions: Option<u32>,
            #[arg(short, long, value_parser = Difficulty::parse)]
            difficulty: Option<Difficulty>,
        },
    }

    fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("quizpool"))
            .unwrap_or_else(|| PathBuf::from(".quizpool"))
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    pub async fn run() -> ExitCode {
        let cli = Cli::parse();
        match execute(cli).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                log::error!("{}", e);
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
        }
    }

    async fn execute(cli: Cli) -> Result<(), CliError> {
        let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);
        let mut settings_storage = FileStorage::open(&data_dir)?;
        let mut settings = Settings::load(&settings_storage);
        settings.apply_env();
        let mut game = Gamification::load(FileStorage::open(&data_dir)?);

        match cli.command {
            Command::Status => print_status(&game),
            Command::List => {
                if game.quizzes().is_empty() {
                    println!("Nothing yet. Generate your first quiz.");
                }
                let now = now_ms();
                for quiz in game.quizzes() {
                    let score = quiz
                        .score
                        .map(|s| format!("{}/{}", s, quiz.question_count()))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<28} {:<7} score {:<6} {}",
                        quiz.id,
                        quiz.difficulty.as_str(),
                        score,
                        format_created_at(quiz.created_at, now)
                    );
                }
            }
            Command::Show {
                id,
                transcript,
                expanded,
                search,
            } => {
                let quiz = game.quiz(&id).ok_or_else(|| CliError::UnknownQuiz(id.clone()))?;
                if transcript {
                    print_transcript(quiz, expanded, search.as_deref().unwrap_or(""));
                } else {
                    let json = serde_json::to_string_pretty(quiz).map_err(io::Error::other)?;
                    println!("{}", json);
                }
            }
            Command::Generate {
                url,
                questions,
                difficulty,
            } => {
                let client = QuizClient::new(&settings.api_base);
                let quiz = client
                    .create_quiz(
                        &url,
                        questions.unwrap_or(settings.num_questions),
                        difficulty.unwrap_or(settings.difficulty),
                        now_ms(),
                    )
                    .await?;
                println!(
                    "Saved quiz {} ({} questions)",
                    quiz.id,
                    quiz.question_count()
                );
                game.add_or_replace_quiz(quiz);
            }
            Command::Transcript { video_id } => {
                let client = QuizClient::new(&settings.api_base);
                println!("{}", client.fetch_transcript(&video_id).await?);
            }
            Command::Play { id } => {
                let player =
                    QuizPlayer::start(&game, &id).ok_or_else(|| CliError::UnknownQuiz(id.clone()))?;
                play(&mut game, player)?;
            }
            Command::Remove { id } => {
                if game.remove_quiz(&id) {
                    println!("Removed {}", id);
                } else {
                    println!("No quiz with id '{}'", id);
                }
            }
            Command::Xp { points } => {
                let gain = game.add_experience(points);
                if gain.leveled_up {
                    println!("Level up! You reached level {}", gain.level);
                    game.acknowledge_level_up();
                }
                print_status(&game);
            }
            Command::Complete { score } => {
                let streak = game.record_completion(score);
                println!("Streak: {} day(s)", streak);
            }
            Command::Settings {
                api_base,
                questions,
                difficulty,
            } => {
                let changed = api_base.is_some() || questions.is_some() || difficulty.is_some();
                if let Some(url) = api_base {
                    settings.set_api_base(&url);
                }
                if let Some(n) = questions {
                    settings.set_num_questions(n);
                }
                if let Some(d) = difficulty {
                    settings.difficulty = d;
                }
                if changed {
                    settings.save(&mut settings_storage)?;
                }
                println!("api base:  {}", settings.api_base);
                println!("questions: {}", settings.num_questions);
                println!("difficulty: {}", settings.difficulty.as_str());
            }
        }

        if let Some(e) = game.last_save_error() {
            log::warn!("Progress not saved: {}", e);
        }
        Ok(())
    }

    fn print_status(game: &Gamification<FileStorage>) {
        println!(
            "Level {}  {}/{} XP ({:.0}%)  streak {}",
            game.level(),
            game.experience_points(),
            game.xp_threshold(),
            game.progress_fraction() * 100.0,
            game.streak()
        );
    }

    /// Transcript preview with matches wrapped in `[[...]]`
    fn print_transcript(quiz: &StoredQuiz, expanded: bool, query: &str) {
        let segments = quiz.transcript_segments(expanded, query);
        if segments.is_empty() {
            println!("No transcript saved for this quiz.");
            return;
        }
        let mut out = String::new();
        let mut matches = 0;
        for segment in &segments {
            if segment.matched {
                matches += 1;
                out.push_str("[[");
                out.push_str(&segment.text);
                out.push_str("]]");
            } else {
                out.push_str(&segment.text);
            }
        }
        if quiz.transcript_truncated(expanded) {
            out.push('…');
        }
        println!("{}", out);
        if !query.is_empty() {
            println!();
            println!("{} match(es) for '{}'", matches, query);
        }
    }

    /// Interactive play loop: numbers pick an option, Enter moves on, `q` quits
    fn play(game: &mut Gamification<FileStorage>, mut player: QuizPlayer) -> Result<(), CliError> {
        let stdin = io::stdin();
        let mut lines = stdin.lock().lines();
        let mut stdout = io::stdout();

        while let Some(question) = player.current_question().cloned() {
            println!();
            println!(
                "Question {}/{}: {}",
                player.current_index() + 1,
                player.total(),
                question.prompt
            );
            for (i, option) in question.options.iter().enumerate() {
                println!("  {}. {}", i + 1, option);
            }

            print!("> ");
            stdout.flush()?;
            let Some(line) = lines.next() else {
                return Ok(());
            };
            let input = line?.trim().to_string();
            if input.eq_ignore_ascii_case("q") {
                return Ok(());
            }

            if let Ok(n) = input.parse::<usize>() {
                if let Some(outcome) = n.checked_sub(1).and_then(|i| player.select(game, i)) {
                    if outcome.correct {
                        println!("Correct! +{} XP", game.xp_per_correct());
                    } else {
                        println!("Not quite. The answer is: {}", outcome.correct_option);
                    }
                    if !outcome.explanation.is_empty() {
                        println!("{}", outcome.explanation);
                    }
                    if game.level_up_pending() {
                        println!("Level up! You reached level {}", game.level());
                        game.acknowledge_level_up();
                    }
                    print!("(Enter for next) ");
                    stdout.flush()?;
                    if lines.next().transpose()?.is_none() {
                        return Ok(());
                    }
                } else {
                    println!("Pick 1-{}", question.options.len());
                    continue;
                }
            }

            if let Some(done) = player.advance(game) {
                print_completion(&player, done);
            }
        }

        // A quiz without questions completes on the first step
        if let Some(done) = player.advance(game) {
            print_completion(&player, done);
        }
        Ok(())
    }

    fn print_completion(player: &QuizPlayer, done: Completion) {
        println!();
        println!("Quiz complete: {}/{}", done.score, done.total);
        println!("Streak: {} day(s)", done.streak);
        println!("{}", player.share_text());
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() -> std::process::ExitCode {
    env_logger::init();
    log::info!("QuizPool starting...");
    cli::run().await
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is quizpool::web::start
}
