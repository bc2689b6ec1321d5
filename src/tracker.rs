use log::{debug, info, warn};

use classroom_seating::builder::SessionBuilder;
use classroom_seating::codec::{self, RosterCheck};
use classroom_seating::score::{compute_scores, student_day_summary};
use classroom_seating::session::{DropTarget, Location, Session, Transition};
use classroom_seating::*;
use snafu::{prelude::*, ErrorCompat};

use std::io::Read;
use std::path::Path;

use text_diff::print_diff;

use crate::args::*;
use crate::tracker::clipboard::*;
use crate::tracker::config_reader::*;
use crate::tracker::store::*;

pub mod clipboard;
pub mod config_reader;
pub mod io_roster;
pub mod report;
pub mod store;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum AppError {
    #[snafu(display("{source}"))]
    Seating { source: SeatingError },

    #[snafu(display("Error reading file {path}"))]
    ReadingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The store {path} is not a valid JSON document"))]
    StoreFormat {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error writing the store {path}"))]
    WritingStore {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error replacing the store {path}"))]
    PersistingStore {
        source: tempfile::PersistError,
        path: String,
    },
    #[snafu(display("The stored value {key} is corrupted"))]
    StoredValue {
        source: serde_json::Error,
        key: String,
    },
    #[snafu(display("Error parsing the configuration file {path}"))]
    ParsingConfig {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Missing worksheet {name} in file {path}"))]
    MissingWorksheet { path: String, name: String },
    #[snafu(display("Error reading the CSV file {path}"))]
    Csv { source: csv::Error, path: String },
    #[snafu(display("Invalid date {date:?}, expected YYYY-MM-DD"))]
    InvalidDate {
        source: chrono::ParseError,
        date: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type AppResult<T> = Result<T, AppError>;

/// Checks a date and returns it in its canonical form.
pub fn parse_date(date: &str) -> AppResult<String> {
    let d = chrono::NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .context(InvalidDateSnafu { date })?;
    Ok(d.format("%Y-%m-%d").to_string())
}

fn resolve_date(date: &Option<String>) -> AppResult<String> {
    match date {
        Some(d) => parse_date(d),
        None => Ok(chrono::Local::now().format("%Y-%m-%d").to_string()),
    }
}

/// Reads the source of a drag: `roster:<name>`, `seat:<row>,<col>` or
/// `cat:<category>#<position>` (1-based, default 1).
pub fn parse_location(input: &str, categories: &CategoryRegistry) -> AppResult<Location> {
    let (kind, value) = match input.split_once(':') {
        Some(x) => x,
        None => {
            whatever!("Invalid source {:?}: expected roster:, seat: or cat:", input)
        }
    };
    let res = match kind {
        "roster" => Location::Roster {
            student: value.trim().to_string(),
        },
        "seat" => {
            let (row, col) = parse_seat(value)?;
            Location::Seat { row, col }
        }
        "cat" => {
            let (label, position) = match value.rsplit_once('#') {
                Some((label, p)) => {
                    let position = match p.trim().parse::<usize>() {
                        Ok(x) if x >= 1 => x,
                        _ => {
                            whatever!("Invalid position {:?}: positions start at 1", p)
                        }
                    };
                    (label, position)
                }
                None => (value, 1),
            };
            let ordinal = categories.require(label.trim()).context(SeatingSnafu)?;
            Location::Category {
                ordinal,
                position: position - 1,
            }
        }
        x => {
            whatever!("Invalid source kind {:?}", x)
        }
    };
    Ok(res)
}

/// Reads the target of a drag: `seat:<row>,<col>`, `cat:<category>`, `trash`
/// or `roster`.
pub fn parse_target(input: &str, categories: &CategoryRegistry) -> AppResult<DropTarget> {
    match input.trim() {
        "trash" => return Ok(DropTarget::Trash),
        "roster" => return Ok(DropTarget::Roster),
        _ => {}
    }
    let res = match input.split_once(':') {
        Some(("seat", value)) => {
            let (row, col) = parse_seat(value)?;
            DropTarget::Seat { row, col }
        }
        Some(("cat", label)) => DropTarget::Category {
            ordinal: categories.require(label.trim()).context(SeatingSnafu)?,
        },
        _ => {
            whatever!(
                "Invalid target {:?}: expected seat:, cat:, trash or roster",
                input
            )
        }
    };
    Ok(res)
}

fn parse_seat(value: &str) -> AppResult<(u32, u32)> {
    let (r, c) = match value.split_once(',') {
        Some(x) => x,
        None => {
            whatever!("Invalid seat {:?}: expected <row>,<col>", value)
        }
    };
    match (r.trim().parse::<u32>(), c.trim().parse::<u32>()) {
        (Ok(row), Ok(col)) => Ok((row, col)),
        _ => {
            whatever!("Invalid seat {:?}: row and column must be numbers", value)
        }
    }
}

/// One name per argument. Commas separate several names in one argument;
/// spaces belong to the names.
fn split_student_args(args: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|a| a.split(','))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn require_student(roster: &ClassRoster, student: &str) -> AppResult<()> {
    if roster.contains(student) {
        Ok(())
    } else {
        Err(SeatingError::NotFound {
            what: "student",
            name: student.to_string(),
        })
        .context(SeatingSnafu)
    }
}

fn describe_transition(t: Transition) -> &'static str {
    match t {
        Transition::Seated => "seated",
        Transition::Moved => "moved",
        Transition::Swapped => "swapped",
        Transition::Added { evicted: false } => "added",
        Transition::Added { evicted: true } => "added, seat freed",
        Transition::Removed => "removed",
        Transition::Unchanged => "nothing changed",
    }
}

/// The commands, working on a store.
pub struct Tracker<S: KeyValueStore> {
    repo: Repository<S>,
    settings: Settings,
    today: String,
}

impl<S: KeyValueStore> Tracker<S> {
    pub fn new(store: S, settings: Settings, today: &str) -> Tracker<S> {
        Tracker {
            repo: Repository::new(store),
            settings,
            today: today.to_string(),
        }
    }

    fn context(&self) -> AppResult<SessionContext> {
        let ctx = SessionContext::new(&self.today)
            .with_categories(self.repo.categories()?)
            .with_layout(self.repo.layout(&self.settings.default_layout)?)
            .with_text_budget(self.settings.text_budget);
        Ok(ctx)
    }

    // ***** Sessions *****

    /// The session of a class at a date: the roster, then the latest seating,
    /// then the record saved for that date.
    fn load_session_at(&self, class: &str, date: &str) -> AppResult<Session> {
        let roster = self.repo.roster(class)?;
        let ctx = SessionContext {
            today: date.to_string(),
            ..self.context()?
        };
        let mut builder = SessionBuilder::new(&roster, &ctx);
        if let Some(snapshot) = self.repo.seat_snapshot(class)? {
            builder = builder.seat_layout(&snapshot).context(SeatingSnafu)?;
        }
        let log = self.repo.attendance_log(class)?;
        if let Some(record) = log.find(date) {
            debug!("load_session_at: found a record for {}", date);
            builder = builder.attendance(record);
        }
        Ok(builder.build())
    }

    fn load_session(&self, class: &str) -> AppResult<Session> {
        self.load_session_at(class, &self.today)
    }

    /// Saves the seating and the record of a session. Empty records are only
    /// saved over an existing one.
    fn save_session(&mut self, session: &Session) -> AppResult<()> {
        let class = session.class_name().to_string();
        let record = session.attendance_record();
        let mut log = self.repo.attendance_log(&class)?;
        if !record.is_empty() || log.find(&record.date).is_some() {
            let change = log.upsert(record);
            debug!("save_session: {} record: {:?}", class, change);
            self.repo.save_attendance_log(&class, &log)?;
        }
        let snapshot = session.seat_snapshot().unwrap_or(SeatLayoutSnapshot {
            rows: session.layout().rows,
            columns: session.layout().columns,
            seats: vec![],
        });
        self.repo.save_seat_snapshot(&class, &snapshot)
    }

    // ***** Classes *****

    pub fn add_class(&mut self, name: &str, students: &[String]) -> AppResult<String> {
        let roster = ClassRoster::new(name, students).context(SeatingSnafu)?;
        let mut rosters = self.repo.rosters()?;
        if let Ok(previous) = rosters.require(&roster.name) {
            if previous.fingerprint() != roster.fingerprint() {
                warn!(
                    "The students of {} changed: share codes made before may resolve to other students",
                    roster.name
                );
            }
        }
        let count = roster.students.len();
        let class = roster.name.clone();
        let outcome = rosters.upsert(roster);
        self.repo.save_rosters(&rosters)?;
        let categories = self.repo.categories()?;
        self.repo.save_categories(&categories)?;
        let verb = match outcome {
            UpsertOutcome::Added => "Added",
            UpsertOutcome::Replaced => "Replaced",
        };
        Ok(format!("{} class {} ({} students)", verb, class, count))
    }

    pub fn remove_class(&mut self, name: &str) -> AppResult<String> {
        let removed = self.repo.remove_class(name.trim())?;
        Ok(format!("Removed class {}", removed.name))
    }

    pub fn list_classes(&self) -> AppResult<String> {
        let rosters = self.repo.rosters()?;
        if rosters.is_empty() {
            return Ok("(no class)".to_string());
        }
        let lines: Vec<String> = rosters
            .classes()
            .iter()
            .map(|c| format!("{} ({} students)", c.name, c.students.len()))
            .collect();
        Ok(lines.join("\n"))
    }

    // ***** Layout *****

    pub fn set_layout(&mut self, rows: &str, columns: &str, aisles: &str) -> AppResult<String> {
        let layout = SeatLayoutConfig::from_input(rows, columns, aisles).context(SeatingSnafu)?;
        self.repo.save_layout(&layout)?;
        info!("Layout set to {}x{}", layout.rows, layout.columns);
        self.show_layout()
    }

    pub fn show_layout(&self) -> AppResult<String> {
        let layout = self.repo.layout(&self.settings.default_layout)?;
        let aisles: Vec<String> = layout.aisle_columns.iter().map(|c| c.to_string()).collect();
        Ok(format!(
            "{} rows, {} columns ({} seats), aisles before columns: [{}]",
            layout.rows,
            layout.columns,
            layout.seat_count(),
            aisles.join(",")
        ))
    }

    // ***** Session commands *****

    pub fn show(&self, class: &str) -> AppResult<String> {
        let session = self.load_session(class)?;
        let unseated: Vec<&str> = session
            .eligible_students()
            .into_iter()
            .filter(|s| session.seat_of(s).is_none())
            .collect();
        Ok(format!(
            "{}\n\nNot seated: {}",
            report::render_session(&session),
            unseated.join(", ")
        ))
    }

    pub fn drag(&mut self, class: &str, from: &str, to: &str) -> AppResult<String> {
        let mut session = self.load_session(class)?;
        let source = parse_location(from, session.categories())?;
        let target = parse_target(to, session.categories())?;
        let t = session.apply(&source, target).context(SeatingSnafu)?;
        debug!("drag: {:?} -> {:?}: {:?}", source, target, t);
        if t != Transition::Unchanged {
            self.save_session(&session)?;
        }
        Ok(format!(
            "{}\n{}",
            describe_transition(t),
            report::render_grid(&session)
        ))
    }

    pub fn mark(&mut self, class: &str, category: &str, students: &[String]) -> AppResult<String> {
        let names = split_student_args(students);
        let mut session = self.load_session(class)?;
        let added = session.mark(category.trim(), &names).context(SeatingSnafu)?;
        self.save_session(&session)?;
        Ok(format!("{} added to {}", added, category.trim()))
    }

    pub fn clear(&mut self, class: &str) -> AppResult<String> {
        let mut session = self.load_session(class)?;
        session.clear_attendance();
        self.save_session(&session)?;
        Ok(format!("Cleared the attendance of {} on {}", class, session.date()))
    }

    /// Picks a student. With `bonus`, the student also gets an entry in the
    /// bonus category, which is saved.
    pub fn roll_call<R: rand::Rng + ?Sized>(
        &mut self,
        class: &str,
        rng: &mut R,
        bonus: bool,
    ) -> AppResult<String> {
        let mut session = self.load_session(class)?;
        let picked = match session.roll_call(rng) {
            Some(s) => s.to_string(),
            None => return Ok("No student available".to_string()),
        };
        if !bonus {
            return Ok(picked);
        }
        session
            .mark(CategoryRegistry::BONUS, &[picked.clone()])
            .context(SeatingSnafu)?;
        self.save_session(&session)?;
        Ok(format!("{} (+{})", picked, CategoryRegistry::BONUS))
    }

    // ***** Share codes *****

    pub fn export_code(&self, class: &str) -> AppResult<String> {
        let session = self.load_session(class)?;
        let ctx = self.context()?;
        let record = session.attendance_record();
        Ok(codec::encode(
            session.roster(),
            session.seat_snapshot().as_ref(),
            Some(&record),
            &ctx,
        ))
    }

    pub fn export<C: ClipboardSink + ?Sized>(
        &self,
        class: &str,
        clipboard: &mut C,
        print: bool,
    ) -> AppResult<String> {
        let code = self.export_code(class)?;
        let copied = deliver(clipboard, &code, print);
        Ok(format!(
            "Share code of {}: {} characters{}",
            class,
            code.chars().count(),
            if copied { ", copied" } else { "" }
        ))
    }

    pub fn import(&mut self, code: &str, dry_run: bool, force: bool) -> AppResult<String> {
        let ctx = self.context()?;
        let rosters = self.repo.rosters()?;
        let decoded = codec::decode(code, &ctx, &rosters).context(SeatingSnafu)?;
        let class = decoded.class_name.clone();
        match &decoded.roster_check {
            RosterCheck::Mismatch { expected, actual } if !force => {
                whatever!(
                    "The students of {} differ from the sender's ({} here, {} in the code). Use --force to import anyway",
                    class,
                    actual,
                    expected
                )
            }
            RosterCheck::Mismatch { .. } => warn!("Importing {} despite a different roster", class),
            RosterCheck::Unchecked => info!("The code carries no roster fingerprint"),
            RosterCheck::Verified => debug!("import: roster verified"),
        }
        let date = match decoded.attendance.as_ref() {
            Some(a) => parse_date(&a.date)?,
            None => self.today.clone(),
        };
        let current = self.load_session_at(&class, &date)?;
        let roster = rosters.require(&class).context(SeatingSnafu)?;
        let mut builder = SessionBuilder::new(roster, &SessionContext {
            today: date.clone(),
            ..ctx
        });
        builder = match (decoded.seat_layout.as_ref(), current.seat_snapshot()) {
            (Some(snapshot), _) => builder.seat_layout(snapshot).context(SeatingSnafu)?,
            (None, Some(snapshot)) => builder.seat_layout(&snapshot).context(SeatingSnafu)?,
            (None, None) => builder,
        };
        let record = match decoded.attendance.as_ref() {
            Some(a) => AttendanceRecord {
                date: date.clone(),
                attendance: a.attendance.clone(),
            },
            None => current.attendance_record(),
        };
        let imported = builder.attendance(&record).build();

        if dry_run {
            let before = report::render_session(&current);
            let after = report::render_session(&imported);
            if before == after {
                return Ok("Dry run: no difference".to_string());
            }
            print_diff(before.as_str(), after.as_str(), "\n");
            return Ok("Dry run: nothing saved".to_string());
        }
        self.save_session(&imported)?;
        Ok(format!(
            "Imported {} for {} ({:?})",
            class, date, decoded.format
        ))
    }

    // ***** Scores and records *****

    pub fn scores(&self, class: &str, tsv: bool) -> AppResult<String> {
        let roster = self.repo.roster(class)?;
        let log = self.repo.attendance_log(class)?;
        let bonuses = self.repo.bonuses(class)?;
        let ctx = self.context()?;
        let report = compute_scores(&roster, log.records(), &bonuses, &ctx);
        let res = if tsv {
            report::render_scores_tsv(&report, &ctx.categories)
        } else {
            report::render_scores(&report, &ctx.categories)
        };
        Ok(res)
    }

    pub fn summary(&self, class: &str, student: &str) -> AppResult<String> {
        let roster = self.repo.roster(class)?;
        let student = student.trim();
        require_student(&roster, student)?;
        let log = self.repo.attendance_log(class)?;
        let days = student_day_summary(student, log.records(), &self.repo.categories()?);
        Ok(report::render_summary(student, &days))
    }

    pub fn set_bonus(&mut self, class: &str, student: &str, points: i64) -> AppResult<String> {
        let roster = self.repo.roster(class)?;
        let student = student.trim();
        require_student(&roster, student)?;
        let mut bonuses = self.repo.bonuses(class)?;
        if points == 0 {
            bonuses.remove(student);
        } else {
            bonuses.insert(student.to_string(), points);
        }
        self.repo.save_bonuses(class, &bonuses)?;
        Ok(format!("Bonus of {}: {}", student, points))
    }

    pub fn list_records(&self, class: &str) -> AppResult<String> {
        let categories = self.repo.categories()?;
        self.repo.roster(class)?;
        let log = self.repo.attendance_log(class)?;
        if log.is_empty() {
            return Ok("(no record)".to_string());
        }
        let mut lines: Vec<String> = Vec::new();
        for r in log.records() {
            lines.push(r.date.clone());
            let described = r.describe(&categories);
            if described.is_empty() {
                lines.push("  (empty)".to_string());
            }
            lines.extend(described.into_iter().map(|l| format!("  {}", l)));
        }
        Ok(lines.join("\n"))
    }

    pub fn delete_record(&mut self, class: &str, date: &str) -> AppResult<String> {
        let mut log = self.repo.attendance_log(class)?;
        let removed = log.remove(date.trim()).context(SeatingSnafu)?;
        self.repo.save_attendance_log(class, &log)?;
        Ok(format!("Deleted the record of {} on {}", class, removed.date))
    }

    /// `changes` are `<category>=<names>` items, each replacing one list.
    pub fn edit_record(
        &mut self,
        class: &str,
        date: &str,
        new_date: Option<&str>,
        changes: &[String],
        overwrite: bool,
    ) -> AppResult<String> {
        let roster = self.repo.roster(class)?;
        let categories = self.repo.categories()?;
        let mut log = self.repo.attendance_log(class)?;
        let date = date.trim();
        let mut record = match log.find(date) {
            Some(r) => r.clone(),
            None => {
                return Err(SeatingError::NotFound {
                    what: "attendance record for date",
                    name: date.to_string(),
                })
                .context(SeatingSnafu)
            }
        };
        if let Some(d) = new_date {
            record.date = parse_date(d)?;
        }
        for change in changes {
            let (label, names) = match change.split_once('=') {
                Some(x) => x,
                None => {
                    whatever!("Invalid change {:?}: expected <category>=<names>", change)
                }
            };
            let ordinal = categories.require(label.trim()).context(SeatingSnafu)?;
            let def = &categories.defs()[ordinal];
            let mut list: Vec<String> = Vec::new();
            for name in parse_name_list(names) {
                require_student(&roster, &name)?;
                if def.is_exclusive() && list.contains(&name) {
                    continue;
                }
                list.push(name);
            }
            record.attendance.insert(def.category.clone(), list);
        }
        let new_date = record.date.clone();
        log.edit(date, record, overwrite).context(SeatingSnafu)?;
        self.repo.save_attendance_log(class, &log)?;
        Ok(format!("Saved the record of {} on {}", class, new_date))
    }
}

fn read_code(code: &Option<String>) -> AppResult<String> {
    match code {
        Some(c) => Ok(c.clone()),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context(ReadingFileSnafu { path: "<stdin>" })?;
            Ok(buffer)
        }
    }
}

/// Runs a command against the store of the configuration.
pub fn run(args: &Args) -> AppResult<()> {
    let config = match &args.config {
        Some(path) => read_config(path)?,
        None => SeatbookConfig::default(),
    };
    let settings = resolve_settings(&config, &args.store)?;
    let today = resolve_date(&args.date)?;
    info!("Using store {} for {}", settings.store_path, today);
    let store = JsonFileStore::open(Path::new(&settings.store_path))?;
    let mut clipboard = CommandClipboard::new(&settings.clipboard_command);
    let mut tracker = Tracker::new(store, settings, &today);

    let out = match &args.command {
        Command::Class(ClassCommand::Add {
            name,
            file,
            names,
            excel_worksheet_name,
        }) => {
            let mut students: Vec<String> = Vec::new();
            if let Some(path) = file {
                students.extend(io_roster::read_roster_file(
                    path,
                    excel_worksheet_name.as_deref(),
                )?);
            }
            if let Some(n) = names {
                students.extend(parse_bulk_names(n));
            }
            tracker.add_class(name, &students)?
        }
        Command::Class(ClassCommand::Remove { name }) => tracker.remove_class(name)?,
        Command::Class(ClassCommand::List) => tracker.list_classes()?,
        Command::Layout(LayoutCommand::Set {
            rows,
            columns,
            aisles,
        }) => tracker.set_layout(rows, columns, aisles)?,
        Command::Layout(LayoutCommand::Show) => tracker.show_layout()?,
        Command::Show { class } => tracker.show(class)?,
        Command::Drag { class, from, to } => tracker.drag(class, from, to)?,
        Command::Mark {
            class,
            category,
            students,
        } => tracker.mark(class, category, students)?,
        Command::Clear { class } => tracker.clear(class)?,
        Command::Rollcall { class, bonus } => {
            tracker.roll_call(class, &mut rand::thread_rng(), *bonus)?
        }
        Command::Export { class, print } => tracker.export(class, &mut clipboard, *print)?,
        Command::Import {
            code,
            dry_run,
            force,
        } => {
            let code = read_code(code)?;
            tracker.import(&code, *dry_run, *force)?
        }
        Command::Scores { class, tsv } => tracker.scores(class, *tsv)?,
        Command::Summary { class, student } => tracker.summary(class, student)?,
        Command::Bonus {
            class,
            student,
            points,
        } => tracker.set_bonus(class, student, *points)?,
        Command::Records(RecordsCommand::List { class }) => tracker.list_records(class)?,
        Command::Records(RecordsCommand::Delete { class, date }) => {
            tracker.delete_record(class, date)?
        }
        Command::Records(RecordsCommand::Edit {
            class,
            date,
            new_date,
            set,
            overwrite,
        }) => tracker.edit_record(class, date, new_date.as_deref(), set, *overwrite)?,
    };
    println!("{}", out);
    Ok(())
}

/// Prints an error with its causes and, when captured, its backtrace.
pub fn report_error(e: &AppError) {
    eprintln!("An error occured: {}", e);
    let mut source = std::error::Error::source(e);
    while let Some(s) = source {
        eprintln!("  caused by: {}", s);
        source = s.source();
    }
    if let Some(backtrace) = ErrorCompat::backtrace(e) {
        eprintln!("{}", backtrace);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn settings() -> Settings {
        Settings {
            store_path: "unused.json".to_string(),
            text_budget: SessionContext::DEFAULT_TEXT_BUDGET,
            clipboard_command: vec![],
            default_layout: SeatLayoutConfig::new(3, 4, &[]).unwrap(),
        }
    }

    fn tracker() -> Tracker<MemoryStore> {
        let mut t = Tracker::new(MemoryStore::default(), settings(), "2024-03-04");
        t.add_class(
            "1A",
            &["Anna".to_string(), "Bo".to_string(), "Chen".to_string()],
        )
        .unwrap();
        t
    }

    struct Recorder {
        texts: Vec<String>,
    }

    impl ClipboardSink for Recorder {
        fn write(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.texts.push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn drag_sources_and_targets() {
        let categories = CategoryRegistry::reference();
        assert_eq!(
            parse_location("roster:Anna", &categories).unwrap(),
            Location::Roster {
                student: "Anna".to_string()
            }
        );
        assert_eq!(
            parse_location("seat:2, 3", &categories).unwrap(),
            Location::Seat { row: 2, col: 3 }
        );
        assert_eq!(
            parse_location("cat:迟#2", &categories).unwrap(),
            Location::Category {
                ordinal: 1,
                position: 1
            }
        );
        assert_eq!(
            parse_location("cat:假", &categories).unwrap(),
            Location::Category {
                ordinal: 2,
                position: 0
            }
        );
        assert!(parse_location("cat:迟#0", &categories).is_err());
        assert!(parse_location("cat:病#1", &categories).is_err());
        assert!(parse_location("desk:1", &categories).is_err());
        assert!(parse_location("seat:1", &categories).is_err());

        assert_eq!(parse_target("trash", &categories).unwrap(), DropTarget::Trash);
        assert_eq!(parse_target("roster", &categories).unwrap(), DropTarget::Roster);
        assert_eq!(
            parse_target("cat:旷", &categories).unwrap(),
            DropTarget::Category { ordinal: 3 }
        );
        assert_eq!(
            parse_target("seat:1,1", &categories).unwrap(),
            DropTarget::Seat { row: 1, col: 1 }
        );
        assert!(parse_target("seat:x,1", &categories).is_err());
    }

    #[test]
    fn dates_are_checked() {
        assert_eq!(parse_date("2024-3-4").unwrap(), "2024-03-04");
        assert!(matches!(
            parse_date("04/03/2024"),
            Err(AppError::InvalidDate { .. })
        ));
    }

    #[test]
    fn classes_are_added_and_removed() {
        let mut t = tracker();
        assert_eq!(t.list_classes().unwrap(), "1A (3 students)");
        let out = t.add_class("1A", &["Anna".to_string()]).unwrap();
        assert_eq!(out, "Replaced class 1A (1 students)");
        assert!(t.add_class("2B", &[]).is_err());
        t.remove_class("1A").unwrap();
        assert_eq!(t.list_classes().unwrap(), "(no class)");
        assert!(t.show("1A").is_err());
    }

    #[test]
    fn session_changes_are_saved() {
        let mut t = tracker();
        t.drag("1A", "roster:Anna", "seat:1,1").unwrap();
        t.mark("1A", "迟", &["Bo,Chen".to_string()]).unwrap();
        t.mark("1A", "假", &["Chen".to_string()]).unwrap();

        let session = t.load_session("1A").unwrap();
        assert_eq!(session.occupant(1, 1), Some("Anna"));
        assert_eq!(
            session.category_students(1),
            &["Bo".to_string(), "Chen".to_string()]
        );
        assert!(session.is_on_leave("Chen"));

        // Leave blocks seating.
        let out = t.drag("1A", "roster:Chen", "seat:2,2").unwrap();
        assert!(out.starts_with("nothing changed"));
        let out = t.drag("1A", "seat:1,1", "cat:假").unwrap();
        assert!(out.starts_with("added, seat freed"));
        assert_eq!(t.load_session("1A").unwrap().seat_of("Anna"), None);

        t.clear("1A").unwrap();
        let session = t.load_session("1A").unwrap();
        assert!(session.attendance_record().is_empty());
        assert!(t.list_records("1A").unwrap().contains("(empty)"));
    }

    #[test]
    fn roll_call_skips_students_on_leave() {
        let mut t = tracker();
        t.mark("1A", "假", &["Anna".to_string(), "Bo".to_string()])
            .unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..10 {
            assert_eq!(t.roll_call("1A", &mut rng, false).unwrap(), "Chen");
        }
        assert!(t.load_session("1A").unwrap().category_students(0).is_empty());
    }

    #[test]
    fn roll_call_can_give_a_bonus() {
        let mut t = tracker();
        t.mark("1A", "假", &["Anna,Bo".to_string()]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(t.roll_call("1A", &mut rng, true).unwrap(), "Chen (+加)");
        assert_eq!(t.roll_call("1A", &mut rng, true).unwrap(), "Chen (+加)");
        let session = t.load_session("1A").unwrap();
        assert_eq!(
            session.category_students(0),
            &["Chen".to_string(), "Chen".to_string()]
        );
        let scores = t.scores("1A", true).unwrap();
        assert!(scores.lines().nth(3).unwrap().starts_with("3\tChen\t2\t"));
    }

    #[test]
    fn marked_names_may_contain_spaces() {
        let mut t = tracker();
        t.add_class(
            "2B",
            &parse_bulk_names("Anna Lee\nBo\tChen Wu"),
        )
        .unwrap();
        assert_eq!(
            split_student_args(&["Anna Lee, Bo".to_string(), " Chen Wu ".to_string()]),
            vec!["Anna Lee", "Bo", "Chen Wu"]
        );
        let out = t
            .mark("2B", "迟", &["Anna Lee,Bo".to_string(), "Chen Wu".to_string()])
            .unwrap();
        assert_eq!(out, "3 added to 迟");
        let session = t.load_session("2B").unwrap();
        assert_eq!(
            session.category_students(1),
            &["Anna Lee".to_string(), "Bo".to_string(), "Chen Wu".to_string()]
        );
        assert!(t.mark("2B", "迟", &["Anna".to_string()]).is_err());
    }

    #[test]
    fn layout_is_saved_and_shown() {
        let mut t = tracker();
        assert_eq!(
            t.show_layout().unwrap(),
            "3 rows, 4 columns (12 seats), aisles before columns: []"
        );
        let out = t.set_layout("5", "6", "3, 9, x").unwrap();
        assert_eq!(out, "5 rows, 6 columns (30 seats), aisles before columns: [3]");
    }

    #[test]
    fn export_then_import_elsewhere() {
        let mut t = tracker();
        t.drag("1A", "roster:Bo", "seat:3,4").unwrap();
        t.mark("1A", "睡", &["Anna".to_string()]).unwrap();
        let mut recorder = Recorder { texts: vec![] };
        t.export("1A", &mut recorder, false).unwrap();
        let code = recorder.texts[0].clone();
        assert!(code.starts_with("SEAT_TXT_v1:"));

        let mut other = Tracker::new(MemoryStore::default(), settings(), "2024-05-01");
        other
            .add_class(
                "1A",
                &["Anna".to_string(), "Bo".to_string(), "Chen".to_string()],
            )
            .unwrap();
        assert_eq!(other.import(&code, true, false).unwrap(), "Dry run: nothing saved");
        assert!(other.list_records("1A").unwrap().contains("(no record)"));

        other.import(&code, false, false).unwrap();
        let session = other.load_session_at("1A", "2024-03-04").unwrap();
        assert_eq!(session.occupant(3, 4), Some("Bo"));
        assert_eq!(session.category_students(4), &["Anna".to_string()]);
        assert_eq!(other.import(&code, true, false).unwrap(), "Dry run: no difference");
    }

    #[test]
    fn import_refuses_a_different_roster() {
        let mut t = tracker();
        t.mark("1A", "迟", &["Anna".to_string()]).unwrap();
        let code = t.export_code("1A").unwrap();

        let mut other = Tracker::new(MemoryStore::default(), settings(), "2024-03-04");
        other
            .add_class(
                "1A",
                &["Bo".to_string(), "Anna".to_string(), "Chen".to_string()],
            )
            .unwrap();
        assert!(other.import(&code, false, false).is_err());
        other.import(&code, false, true).unwrap();
        // Index 0 is Bo here.
        let session = other.load_session("1A").unwrap();
        assert_eq!(session.category_students(1), &["Bo".to_string()]);
    }

    #[test]
    fn scores_bonus_and_summary() {
        let mut t = tracker();
        t.mark("1A", "迟", &["Bo".to_string(), "Bo".to_string()])
            .unwrap();
        t.set_bonus("1A", "Chen", 5).unwrap();
        assert!(t.set_bonus("1A", "Zed", 5).is_err());
        let tsv = t.scores("1A", true).unwrap();
        let lines: Vec<&str> = tsv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("2\tBo\t0\t2\t"));
        assert!(lines[3].ends_with("\t100\t5\t105\t100"));
        assert_eq!(t.summary("1A", "Bo").unwrap(), "Bo: 迟 1 day(s)");
        assert!(t.summary("1A", "Zed").is_err());
    }

    #[test]
    fn records_are_edited_and_deleted() {
        let mut t = tracker();
        t.mark("1A", "迟", &["Bo".to_string()]).unwrap();
        t.edit_record(
            "1A",
            "2024-03-04",
            Some("2024-03-01"),
            &["旷=Anna Anna".to_string(), "假=Chen,Chen".to_string()],
            false,
        )
        .unwrap();
        let log = t.repo.attendance_log("1A").unwrap();
        let record = log.find("2024-03-01").unwrap();
        assert_eq!(record.students("旷"), &["Anna".to_string(), "Anna".to_string()]);
        assert_eq!(record.students("假"), &["Chen".to_string()]);
        assert_eq!(record.students("迟"), &["Bo".to_string()]);
        assert!(log.find("2024-03-04").is_none());

        assert!(t
            .edit_record("1A", "2024-03-01", None, &["迟=Zed".to_string()], false)
            .is_err());
        assert!(t
            .edit_record("1A", "2024-03-01", None, &["迟".to_string()], false)
            .is_err());
        t.delete_record("1A", "2024-03-01").unwrap();
        assert!(t.delete_record("1A", "2024-03-01").is_err());
    }
}
