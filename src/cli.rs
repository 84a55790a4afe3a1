use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "todosheets")]
#[command(about = "A to-do list kept in a Google Sheet", long_about = None)]
pub struct Cli {
    /// Path to the config file (defaults to the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bearer token to use instead of the token command (can be set via TODOSHEETS_TOKEN env var)
    #[arg(long)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and show the current list (or the available sheets)
    Login,

    /// List spreadsheets available to the signed-in user
    Sheets,

    /// Use an existing spreadsheet for the list
    Select {
        /// Spreadsheet id as shown by `sheets`
        id: String,
    },

    /// Create a new spreadsheet for the list and select it
    Create {
        /// Title of the new spreadsheet
        #[arg(short, long)]
        title: Option<String>,
    },

    /// Forget the selected spreadsheet and list the available ones
    ChangeSheet,

    /// Show open tasks
    List,

    /// Add a task
    Add {
        /// Task text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Change the text of a task
    Edit {
        /// Task id (sheet row)
        id: u32,

        /// New task text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Mark a task as done
    Done {
        /// Task id (sheet row)
        id: u32,
    },

    /// Show sign-in and sheet selection state
    Status,

    /// Show current weather for a place name or zip code
    Weather {
        #[arg(required = true, num_args = 1..)]
        location: Vec<String>,
    },
}
