use clap::{Parser, Subcommand};

/// This is a seating chart and attendance tracker for classrooms.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON configuration file. See the manual of classroom_seating
    /// for the available options.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path, optional) The file holding the classes and their records. Setting this
    /// option overrides the path that may be specified with the --config option.
    #[clap(short, long, value_parser)]
    pub store: Option<String>,

    /// (YYYY-MM-DD, default today) The date of the session to work on.
    #[clap(short, long, value_parser)]
    pub date: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Adds, removes or lists classes.
    #[clap(subcommand)]
    Class(ClassCommand),

    /// Changes or shows the size of the seating grid.
    #[clap(subcommand)]
    Layout(LayoutCommand),

    /// Shows the seating and the attendance of a class.
    Show { class: String },

    /// Moves a student, as with drag and drop.
    ///
    /// Sources: `roster:<name>`, `seat:<row>,<col>`, `cat:<category>#<position>`.
    /// Targets: `seat:<row>,<col>`, `cat:<category>`, `trash`, `roster`.
    Drag {
        class: String,
        from: String,
        to: String,
    },

    /// Adds students to an attendance category.
    Mark {
        class: String,
        category: String,
        /// The students. Several names may be given in one argument, separated by commas.
        #[clap(required = true)]
        students: Vec<String>,
    },

    /// Empties all the attendance categories of the session.
    Clear { class: String },

    /// Picks a random student who is not on leave.
    Rollcall {
        class: String,
        /// Also records a bonus (加) for the picked student.
        #[clap(long, takes_value = false)]
        bonus: bool,
    },

    /// Produces the share code of the session and copies it to the clipboard.
    Export {
        class: String,
        /// Prints the code even when it was copied.
        #[clap(long, takes_value = false)]
        print: bool,
    },

    /// Reads a share code and saves its content.
    Import {
        /// The code. Read from the standard input when missing.
        code: Option<String>,
        /// Shows the differences with the saved data without saving.
        #[clap(long, takes_value = false)]
        dry_run: bool,
        /// Imports even when the roster of the code differs from the local one.
        #[clap(long, takes_value = false)]
        force: bool,
    },

    /// Computes the scores of a class over all its records.
    Scores {
        class: String,
        /// Prints tab-separated values, for pasting into a spreadsheet.
        #[clap(long, takes_value = false)]
        tsv: bool,
    },

    /// Shows on how many days a student was in each category.
    Summary { class: String, student: String },

    /// Sets the manual bonus of a student.
    Bonus {
        class: String,
        student: String,
        #[clap(allow_hyphen_values = true)]
        points: i64,
    },

    /// Lists, deletes or edits the attendance records.
    #[clap(subcommand)]
    Records(RecordsCommand),
}

#[derive(Subcommand, Debug, Clone)]
pub enum ClassCommand {
    /// Adds a class, or replaces the students of an existing class.
    Add {
        name: String,
        /// (file path) A text file with one name per line, a CSV file or an Excel (.xlsx)
        /// file. The names are read from the first column.
        #[clap(short, long, value_parser)]
        file: Option<String>,
        /// The names, separated by new lines or tabs.
        #[clap(short, long, value_parser)]
        names: Option<String>,
        /// (default: the first worksheet) When using an Excel file, the name of the worksheet.
        #[clap(long, value_parser)]
        excel_worksheet_name: Option<String>,
    },
    /// Removes a class with its records, seating and bonuses.
    Remove { name: String },
    List,
}

#[derive(Subcommand, Debug, Clone)]
pub enum LayoutCommand {
    Set {
        rows: String,
        columns: String,
        /// (list of comma-separated columns) The columns preceded by an aisle.
        #[clap(long, default_value = "")]
        aisles: String,
    },
    Show,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RecordsCommand {
    List { class: String },
    Delete { class: String, date: String },
    /// Changes the date or the lists of a record.
    Edit {
        class: String,
        date: String,
        /// Moves the record to another date.
        #[clap(long, value_parser)]
        new_date: Option<String>,
        /// `<category>=<names>` replaces the list of a category. Names are separated by
        /// commas or spaces. May be repeated.
        #[clap(long = "set", value_parser)]
        set: Vec<String>,
        /// Replaces the record already saved at the new date.
        #[clap(long, takes_value = false)]
        overwrite: bool,
    },
}
