//! Line commands typed into the console, mapped onto list intents.

use client_core::ListIntent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    List(ListIntent),
    FormField { name: String, value: String },
    SubmitForm,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  search <text>         filter by free text (empty clears)
  sort <key>            sort by column; repeat to flip direction
  page <n> | next | prev
  select <id> | clear   open/close the detail view
  refresh
  form <field> <value>  fill the add-user form (username, email, phoneNumber, password, role)
  submit                create the user from the form
  help | quit";

pub fn parse_command(line: &str) -> Result<ConsoleCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "search" => ConsoleCommand::List(ListIntent::SetSearchTerm(rest.to_string())),
        "sort" if !rest.is_empty() => ConsoleCommand::List(ListIntent::SetSort(rest.to_string())),
        "page" => {
            let page = rest
                .parse::<u32>()
                .map_err(|_| format!("expected a page number, got '{rest}'"))?;
            ConsoleCommand::List(ListIntent::SetPage(page))
        }
        "next" => ConsoleCommand::List(ListIntent::NextPage),
        "prev" | "previous" => ConsoleCommand::List(ListIntent::PreviousPage),
        "select" if !rest.is_empty() => ConsoleCommand::List(ListIntent::Select(rest.to_string())),
        "clear" => ConsoleCommand::List(ListIntent::ClearSelection),
        "refresh" => ConsoleCommand::List(ListIntent::Refresh),
        "form" => {
            let (name, value) = rest
                .split_once(char::is_whitespace)
                .map(|(name, value)| (name, value.trim()))
                .unwrap_or((rest, ""));
            if name.is_empty() {
                return Err("usage: form <field> <value>".to_string());
            }
            ConsoleCommand::FormField {
                name: name.to_string(),
                value: value.to_string(),
            }
        }
        "submit" => ConsoleCommand::SubmitForm,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        "sort" | "select" => return Err(format!("usage: {verb} <value>")),
        "" => return Err("empty command".to_string()),
        other => return Err(format!("unknown command '{other}'; type 'help'")),
    };
    Ok(command)
}
