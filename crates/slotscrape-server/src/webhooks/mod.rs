//! Chat platform ingress. Each platform parses its own payload into either an
//! immediate reply or an enqueue, then acknowledges within its deadline.

pub mod discord;
pub mod telegram;

/// Usage text shared by both platforms' help replies.
pub(crate) const USAGE: &str = "🎰 slotscrape commands\n\n\
/copy <url> - scrape one game page and save it\n\
/scrape <url> - same as /copy\n\
/help - show this message\n\n\
Example: /copy https://www.slotcatalog.com/en/slots/sweet-bonanza\n\
The result is posted here when the job finishes.";
