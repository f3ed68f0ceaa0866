use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use peerfund_core::UserId;
use peerfund_directory::{BankDetails, Beneficiary, KycRecord, UserProfile};

use super::r#trait::{DirectoryError, DirectoryStore, ResetToken};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<UserId, UserProfile>,
    emails: HashMap<String, UserId>,
    usernames: HashMap<String, UserId>,

    bank_details: HashMap<UserId, BankDetails>,
    kyc: HashMap<UserId, KycRecord>,
    beneficiaries: HashMap<UserId, Vec<Beneficiary>>,
    /// Account numbers and IFSC codes in use across bank details and
    /// beneficiaries.
    account_numbers: HashSet<String>,
    ifsc_codes: HashSet<String>,

    reset_tokens: HashMap<UserId, ResetToken>,
}

/// In-memory directory store.
///
/// A single `RwLock` guards all tables, so uniqueness checks, upserts, and
/// the deletion cascade are each atomic.
#[derive(Debug, Default)]
pub struct InMemoryDirectoryStore {
    inner: RwLock<Inner>,
}

impl InMemoryDirectoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl DirectoryStore for InMemoryDirectoryStore {
    fn create_user(&self, profile: UserProfile) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().map_err(|_| DirectoryError::Unavailable)?;

        let email = normalize_email(&profile.email);
        if inner.emails.contains_key(&email) || inner.usernames.contains_key(&profile.username) {
            return Err(DirectoryError::DuplicateIdentity);
        }

        inner.emails.insert(email, profile.user_id);
        inner.usernames.insert(profile.username.clone(), profile.user_id);
        inner.users.insert(profile.user_id, profile);
        Ok(())
    }

    fn find_user_by_id(&self, user_id: UserId) -> Option<UserProfile> {
        let inner = self.inner.read().ok()?;
        inner.users.get(&user_id).cloned()
    }

    fn find_user_by_email(&self, email: &str) -> Option<UserProfile> {
        let inner = self.inner.read().ok()?;
        let user_id = inner.emails.get(&normalize_email(email))?;
        inner.users.get(user_id).cloned()
    }

    fn list_users(&self) -> Vec<UserProfile> {
        let Ok(inner) = self.inner.read() else {
            return vec![];
        };
        let mut users: Vec<_> = inner.users.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        users
    }

    fn update_password(
        &self,
        user_id: UserId,
        password_hash: String,
    ) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().map_err(|_| DirectoryError::Unavailable)?;
        let user = inner
            .users
            .get_mut(&user_id)
            .ok_or_else(|| DirectoryError::NotFound("user not found".to_string()))?;
        user.password_hash = password_hash;
        Ok(())
    }

    fn upsert_bank_details(&self, details: BankDetails) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().map_err(|_| DirectoryError::Unavailable)?;

        if !inner.users.contains_key(&details.user_id) {
            return Err(DirectoryError::NotFound("user not found".to_string()));
        }

        // A user replacing their own record frees its keys first.
        let previous = inner.bank_details.get(&details.user_id).cloned();
        let owns_account_no = previous
            .as_ref()
            .is_some_and(|p| p.account_no == details.account_no);
        let owns_ifsc = previous.as_ref().is_some_and(|p| p.ifsc == details.ifsc);

        if inner.account_numbers.contains(&details.account_no) && !owns_account_no {
            return Err(DirectoryError::DuplicateBankKeys);
        }
        if inner.ifsc_codes.contains(&details.ifsc) && !owns_ifsc {
            return Err(DirectoryError::DuplicateBankKeys);
        }

        if let Some(previous) = previous {
            inner.account_numbers.remove(&previous.account_no);
            inner.ifsc_codes.remove(&previous.ifsc);
        }
        inner.account_numbers.insert(details.account_no.clone());
        inner.ifsc_codes.insert(details.ifsc.clone());
        inner.bank_details.insert(details.user_id, details);
        Ok(())
    }

    fn bank_details(&self, user_id: UserId) -> Option<BankDetails> {
        let inner = self.inner.read().ok()?;
        inner.bank_details.get(&user_id).cloned()
    }

    fn upsert_kyc(&self, record: KycRecord) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().map_err(|_| DirectoryError::Unavailable)?;

        if !inner.users.contains_key(&record.user_id) {
            return Err(DirectoryError::NotFound("user not found".to_string()));
        }

        inner.kyc.insert(record.user_id, record);
        Ok(())
    }

    fn kyc(&self, user_id: UserId) -> Option<KycRecord> {
        let inner = self.inner.read().ok()?;
        inner.kyc.get(&user_id).cloned()
    }

    fn append_beneficiary(
        &self,
        user_id: UserId,
        beneficiary: Beneficiary,
    ) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().map_err(|_| DirectoryError::Unavailable)?;

        if !inner.users.contains_key(&user_id) {
            return Err(DirectoryError::NotFound("user not found".to_string()));
        }
        if inner.account_numbers.contains(&beneficiary.account_no)
            || inner.ifsc_codes.contains(&beneficiary.ifsc)
        {
            return Err(DirectoryError::DuplicateBankKeys);
        }

        inner.account_numbers.insert(beneficiary.account_no.clone());
        inner.ifsc_codes.insert(beneficiary.ifsc.clone());
        inner.beneficiaries.entry(user_id).or_default().push(beneficiary);
        Ok(())
    }

    fn beneficiaries(&self, user_id: UserId) -> Vec<Beneficiary> {
        let Ok(inner) = self.inner.read() else {
            return vec![];
        };
        inner.beneficiaries.get(&user_id).cloned().unwrap_or_default()
    }

    fn put_reset_token(&self, token: ResetToken) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().map_err(|_| DirectoryError::Unavailable)?;

        if !inner.users.contains_key(&token.user_id) {
            return Err(DirectoryError::NotFound("user not found".to_string()));
        }

        inner.reset_tokens.insert(token.user_id, token);
        Ok(())
    }

    fn take_reset_token(&self, user_id: UserId, token: &str) -> bool {
        let Ok(mut inner) = self.inner.write() else {
            return false;
        };
        match inner.reset_tokens.get(&user_id) {
            Some(stored) if stored.token == token => {
                inner.reset_tokens.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    fn delete_user_data(&self, user_id: UserId) -> Result<(), DirectoryError> {
        let mut inner = self.inner.write().map_err(|_| DirectoryError::Unavailable)?;

        let Some(profile) = inner.users.remove(&user_id) else {
            return Err(DirectoryError::NotFound("user not found".to_string()));
        };

        inner.emails.remove(&normalize_email(&profile.email));
        inner.usernames.remove(&profile.username);

        if let Some(details) = inner.bank_details.remove(&user_id) {
            inner.account_numbers.remove(&details.account_no);
            inner.ifsc_codes.remove(&details.ifsc);
        }
        inner.kyc.remove(&user_id);
        if let Some(beneficiaries) = inner.beneficiaries.remove(&user_id) {
            for b in beneficiaries {
                inner.account_numbers.remove(&b.account_no);
                inner.ifsc_codes.remove(&b.ifsc);
            }
        }
        inner.reset_tokens.remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn profile(username: &str, email: &str) -> UserProfile {
        UserProfile::new(UserId::new(), username, email, "$argon2id$stub", Utc::now())
    }

    fn bank_details(user_id: UserId, account_no: &str, ifsc: &str) -> BankDetails {
        BankDetails {
            user_id,
            acc_holder_name: "Asha Rao".to_string(),
            bank_name: "SBI".to_string(),
            account_no: account_no.to_string(),
            ifsc: ifsc.to_string(),
            account_type: "Savings account".to_string(),
        }
    }

    #[test]
    fn duplicate_email_or_username_is_rejected() {
        let store = InMemoryDirectoryStore::new();
        store.create_user(profile("alice99", "alice@example.com")).unwrap();

        let err = store
            .create_user(profile("alice99", "other@example.com"))
            .unwrap_err();
        assert_eq!(err, DirectoryError::DuplicateIdentity);

        let err = store
            .create_user(profile("bob2000", "ALICE@example.com"))
            .unwrap_err();
        assert_eq!(err, DirectoryError::DuplicateIdentity);
    }

    #[test]
    fn bank_details_upsert_is_idempotent_per_user() {
        let store = InMemoryDirectoryStore::new();
        let user = profile("alice99", "alice@example.com");
        let user_id = user.user_id;
        store.create_user(user).unwrap();

        store
            .upsert_bank_details(bank_details(user_id, "0012345678", "SBIN0001234"))
            .unwrap();
        // Replacing the user's own record keeps the same keys.
        store
            .upsert_bank_details(bank_details(user_id, "0012345678", "SBIN0001234"))
            .unwrap();

        assert_eq!(store.bank_details(user_id).unwrap().account_no, "0012345678");
    }

    #[test]
    fn account_number_is_unique_across_users() {
        let store = InMemoryDirectoryStore::new();
        let a = profile("alice99", "alice@example.com");
        let b = profile("bob2000", "bob@example.com");
        let (a_id, b_id) = (a.user_id, b.user_id);
        store.create_user(a).unwrap();
        store.create_user(b).unwrap();

        store
            .upsert_bank_details(bank_details(a_id, "0012345678", "SBIN0001234"))
            .unwrap();
        let err = store
            .upsert_bank_details(bank_details(b_id, "0012345678", "HDFC0000123"))
            .unwrap_err();
        assert_eq!(err, DirectoryError::DuplicateBankKeys);
    }

    #[test]
    fn reset_token_is_consumed_on_use() {
        let store = InMemoryDirectoryStore::new();
        let user = profile("alice99", "alice@example.com");
        let user_id = user.user_id;
        store.create_user(user).unwrap();

        store
            .put_reset_token(ResetToken {
                user_id,
                token: "abc123".to_string(),
                created_at: Utc::now(),
            })
            .unwrap();

        assert!(!store.take_reset_token(user_id, "wrong"));
        assert!(store.take_reset_token(user_id, "abc123"));
        // Second use fails: the token is gone.
        assert!(!store.take_reset_token(user_id, "abc123"));
    }

    #[test]
    fn delete_cascades_every_record() {
        let store = InMemoryDirectoryStore::new();
        let user = profile("alice99", "alice@example.com");
        let user_id = user.user_id;
        store.create_user(user).unwrap();
        store
            .upsert_bank_details(bank_details(user_id, "0012345678", "SBIN0001234"))
            .unwrap();
        store
            .upsert_kyc(KycRecord {
                user_id,
                acc_holder_name: "Asha Rao".to_string(),
                mobile_no: "9876543210".to_string(),
                pan: "ABCDE1234F".to_string(),
                aadhar: "123412341234".to_string(),
            })
            .unwrap();

        store.delete_user_data(user_id).unwrap();

        assert!(store.find_user_by_id(user_id).is_none());
        assert!(store.find_user_by_email("alice@example.com").is_none());
        assert!(store.bank_details(user_id).is_none());
        assert!(store.kyc(user_id).is_none());
        assert!(store.beneficiaries(user_id).is_empty());

        // Freed keys are reusable by a new registration.
        let replacement = profile("alice99", "alice@example.com");
        let replacement_id = replacement.user_id;
        store.create_user(replacement).unwrap();
        store
            .upsert_bank_details(bank_details(replacement_id, "0012345678", "SBIN0001234"))
            .unwrap();
    }
}
