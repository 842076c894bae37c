//! hvr-messages
//!
//! Message templates for everything the operator reads, plus the `msg!`
//! macro that fills `{placeholders}` in them.

pub mod builder;
pub mod messages;

pub use messages::MESSAGES;

/// Fill a message template.
///
/// ```
/// use hvr_messages::{msg, MESSAGES};
///
/// let line = msg!(MESSAGES.restore.success, entity = "SQL01", target = "SQL01_Restored");
/// assert_eq!(line, "Restored 'SQL01' as 'SQL01_Restored'");
/// ```
#[macro_export]
macro_rules! msg {
    ($template:expr) => {
        $crate::builder::Template::new($template).render()
    };
    ($template:expr, $($key:ident = $value:expr),+ $(,)?) => {
        {
            let mut template = $crate::builder::Template::new($template);
            $(
                template = template.with(stringify!($key), $value);
            )+
            template.render()
        }
    };
}
