//! System prompts and history shaping per assistance mode.

use lexchat_protocol::{ChatMessage, Mode};

use crate::inference::RuntimeMessage;

const AGENT_PROMPT: &str = "Vous êtes un assistant juridique IA capable d'avoir une conversation \
suivie avec l'utilisateur. Répondez de manière naturelle, structurée et précise. Citez vos \
sources lorsque vous vous appuyez sur un texte, et demandez des précisions si la question est \
ambiguë. N'inventez jamais d'informations.";

const RESUME_PROMPT: &str = "Vous êtes un assistant IA spécialisé dans la synthèse de textes \
juridiques. Votre tâche est de produire des résumés accessibles mais professionnels destinés à \
des praticiens du droit. Vos résumés doivent : 1) Être plus accessibles que le document original \
tout en conservant la précision juridique, 2) Être bien structurés avec des sections claires \
(contexte, éléments clés, implications, conclusions), 3) Être exhaustifs en couvrant tous les \
aspects importants du texte, 4) Maintenir un ton professionnel adapté aux juristes. Structurez \
votre résumé de manière logique et hiérarchisée.";

/// System prompt prepended for `mode`, if any.
pub fn system_prompt(mode: Mode) -> Option<&'static str> {
    match mode {
        Mode::Chat => None,
        Mode::Agent => Some(AGENT_PROMPT),
        Mode::Resume => Some(RESUME_PROMPT),
    }
}

/// Build the runtime conversation for one request.
///
/// The agent mode only keeps the `agent_window` most recent messages.
pub fn build_runtime_messages(
    mode: Mode,
    messages: Vec<ChatMessage>,
    agent_window: usize,
) -> Vec<RuntimeMessage> {
    let skip = match mode {
        Mode::Agent => messages.len().saturating_sub(agent_window),
        Mode::Chat | Mode::Resume => 0,
    };

    system_prompt(mode)
        .map(RuntimeMessage::system)
        .into_iter()
        .chain(messages.into_iter().skip(skip).map(RuntimeMessage::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::RuntimeRole;

    fn history(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    ChatMessage::user(format!("q{i}"))
                } else {
                    ChatMessage::assistant(format!("a{i}"))
                }
            })
            .collect()
    }

    #[test]
    fn test_chat_mode_passes_history_through() {
        let out = build_runtime_messages(Mode::Chat, history(3), 10);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].role, RuntimeRole::User);
        assert_eq!(out[1].role, RuntimeRole::Assistant);
    }

    #[test]
    fn test_agent_mode_windows_history() {
        let out = build_runtime_messages(Mode::Agent, history(15), 10);
        assert_eq!(out.len(), 11);
        assert_eq!(out[0].role, RuntimeRole::System);
        assert_eq!(out[1].content, "a5");
        assert_eq!(out[10].content, "q14");
    }

    #[test]
    fn test_resume_mode_prepends_summary_prompt() {
        let out = build_runtime_messages(Mode::Resume, history(1), 10);
        assert_eq!(out.len(), 2);
        assert!(out[0].content.contains("synthèse"));
    }
}
