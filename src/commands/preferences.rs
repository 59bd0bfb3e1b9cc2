use crate::args::{ThemeArgs, UserArgs};
use crate::commands::Out;
use crate::ledger::Preference;
use crate::model::Theme;
use crate::{Ledger, Result};

/// Makes `args.name()` the current member, or moves on to the next member when no name is given.
/// The current member is the default payer of new transactions.
pub async fn user(ledger: &Ledger, args: &UserArgs) -> Result<Out<String>> {
    let preference = match args.name() {
        Some(name) => Preference::CurrentUser(name.to_string()),
        None => Preference::ToggleUser,
    };
    ledger.set_preference(preference).await?;
    let current = ledger.current_user();
    Ok(Out::new(format!("The current member is {current}"), current))
}

pub async fn theme(ledger: &Ledger, args: &ThemeArgs) -> Result<Out<Theme>> {
    ledger
        .set_preference(Preference::Theme(args.theme()))
        .await?;
    let theme = ledger.theme();
    Ok(Out::new(format!("The theme is {theme}"), theme))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_user_toggle_and_set() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        let out = user(&ledger, &UserArgs::new(None)).await.unwrap();
        assert_eq!(out.message(), "The current member is 小豬");
        let out = user(&ledger, &UserArgs::new(Some("MANDY".to_string())))
            .await
            .unwrap();
        assert_eq!(out.structure().unwrap(), "Mandy");
        assert!(user(&ledger, &UserArgs::new(Some("Grandma".to_string())))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_theme() {
        let env = TestEnv::new().await;
        let ledger = env.ledger().await;
        let out = theme(&ledger, &ThemeArgs::new(Theme::Matcha)).await.unwrap();
        assert_eq!(out.message(), "The theme is matcha");
        assert_eq!(env.ledger().await.theme(), Theme::Matcha);
    }
}
