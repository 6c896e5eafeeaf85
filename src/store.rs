//! The ledger: a single JSON file holding everybody's records.

use std::{collections::BTreeMap, error, fmt, io};

use chrono::NaiveDate;
use clap::Args;
use schemars::JsonSchema;
use tokio::fs;

use crate::{
    models::{DEFAULT_TARGET_CURRENCY, Expense, Income, UserProfile},
    prelude::*,
    receipt::ReceiptImage,
};

/// Where receipts are kept, relative to the ledger's directory.
const RECEIPTS_DIR: &str = "receipts";

/// Options for finding the ledger and its owner.
#[derive(Args, Clone, Debug)]
pub struct LedgerOpts {
    /// The ledger file. Created if it doesn't exist.
    #[clap(long, env = "BUDGETLENS_LEDGER", default_value = "budgetlens.json")]
    pub ledger: PathBuf,

    /// The user whose records we're working with.
    #[clap(short = 'u', long, env = "BUDGETLENS_USER", default_value = "default")]
    pub user: String,
}

impl LedgerOpts {
    /// Load the ledger.
    pub async fn load(&self) -> Result<Ledger> {
        Ledger::load(&self.ledger).await
    }

    /// Save the ledger.
    pub async fn save(&self, ledger: &Ledger) -> Result<()> {
        ledger.save(&self.ledger).await
    }
}

/// The kind of record a [`NotFound`] error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordKind {
    Expense,
    Income,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Expense => write!(f, "expense"),
            RecordKind::Income => write!(f, "income"),
        }
    }
}

/// A record doesn't exist, or belongs to somebody else. We don't
/// distinguish the two cases.
#[derive(Debug, PartialEq, Eq)]
pub struct NotFound {
    pub kind: RecordKind,
    pub id: u64,
}

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} not found", self.kind, self.id)
    }
}

impl error::Error for NotFound {}

/// Everything we store.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct Ledger {
    /// User profiles, keyed by user.
    pub profiles: BTreeMap<String, UserProfile>,

    pub expenses: Vec<Expense>,

    pub incomes: Vec<Income>,

    /// The next expense ID to hand out.
    pub next_expense_id: u64,

    /// The next income ID to hand out.
    pub next_income_id: u64,
}

impl Ledger {
    /// Load a ledger. A missing file is an empty ledger.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn load(path: &Path) -> Result<Self> {
        match fs::read(path).await {
            Ok(data) => serde_json::from_slice(&data)
                .with_context(|| format!("cannot parse ledger {:?}", path.display())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("No ledger yet, starting empty");
                Ok(Self::default())
            }
            Err(err) => Err(err)
                .with_context(|| format!("cannot read ledger {:?}", path.display())),
        }
    }

    /// Save a ledger. We write to a temporary file next to `path` and rename
    /// it into place, so readers never see a partial ledger.
    #[instrument(level = "debug", skip_all, fields(path = %path.display()))]
    pub async fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec_pretty(self).context("cannot serialize ledger")?;
        let tmp_path = path.with_extension("json.tmp");
        if let Some(dir) = parent_dir(path) {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("cannot create {:?}", dir.display()))?;
        }
        fs::write(&tmp_path, &data)
            .await
            .with_context(|| format!("cannot write {:?}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .await
            .with_context(|| format!("cannot replace ledger {:?}", path.display()))?;
        Ok(())
    }

    /// The currency we convert `user`'s records into.
    pub fn target_currency(&self, user: &str) -> &str {
        self.profiles
            .get(user)
            .map(|profile| profile.target_currency.as_str())
            .unwrap_or(DEFAULT_TARGET_CURRENCY)
    }

    /// Set `user`'s target currency. Existing records keep their old
    /// converted amounts.
    pub fn set_target_currency(&mut self, user: &str, currency: String) {
        self.profiles.insert(
            user.to_owned(),
            UserProfile {
                user: user.to_owned(),
                target_currency: currency,
            },
        );
    }

    /// Store a new expense, assigning it an ID.
    pub fn insert_expense(&mut self, mut expense: Expense) -> &Expense {
        let max_id = self.expenses.iter().map(|e| e.id).max().unwrap_or(0);
        self.next_expense_id = self.next_expense_id.max(max_id + 1);
        expense.id = self.next_expense_id;
        self.next_expense_id += 1;
        self.expenses.push(expense);
        &self.expenses[self.expenses.len() - 1]
    }

    /// Store a new income, assigning it an ID.
    pub fn insert_income(&mut self, mut income: Income) -> &Income {
        let max_id = self.incomes.iter().map(|i| i.id).max().unwrap_or(0);
        self.next_income_id = self.next_income_id.max(max_id + 1);
        income.id = self.next_income_id;
        self.next_income_id += 1;
        self.incomes.push(income);
        &self.incomes[self.incomes.len() - 1]
    }

    /// Look up one of `user`'s expenses.
    pub fn expense(&self, user: &str, id: u64) -> Result<&Expense, NotFound> {
        self.expenses
            .iter()
            .find(|e| e.id == id && e.user == user)
            .ok_or(NotFound {
                kind: RecordKind::Expense,
                id,
            })
    }

    /// Look up one of `user`'s expenses for editing.
    pub fn expense_mut(&mut self, user: &str, id: u64) -> Result<&mut Expense, NotFound> {
        self.expenses
            .iter_mut()
            .find(|e| e.id == id && e.user == user)
            .ok_or(NotFound {
                kind: RecordKind::Expense,
                id,
            })
    }

    /// Look up one of `user`'s incomes.
    pub fn income(&self, user: &str, id: u64) -> Result<&Income, NotFound> {
        self.incomes
            .iter()
            .find(|i| i.id == id && i.user == user)
            .ok_or(NotFound {
                kind: RecordKind::Income,
                id,
            })
    }

    /// Look up one of `user`'s incomes for editing.
    pub fn income_mut(&mut self, user: &str, id: u64) -> Result<&mut Income, NotFound> {
        self.incomes
            .iter_mut()
            .find(|i| i.id == id && i.user == user)
            .ok_or(NotFound {
                kind: RecordKind::Income,
                id,
            })
    }

    /// `user`'s expenses, newest first.
    pub fn expenses_for(&self, user: &str) -> Vec<&Expense> {
        newest_first(
            self.expenses.iter().filter(|e| e.user == user),
            |e| (e.expense_date, e.id),
        )
    }

    /// `user`'s incomes, newest first.
    pub fn incomes_for(&self, user: &str) -> Vec<&Income> {
        newest_first(
            self.incomes.iter().filter(|i| i.user == user),
            |i| (i.income_date, i.id),
        )
    }
}

/// Sort records by date descending, breaking ties by newest ID.
fn newest_first<'a, T>(
    records: impl Iterator<Item = &'a T>,
    key: impl Fn(&T) -> (NaiveDate, u64),
) -> Vec<&'a T>
where
    T: 'a,
{
    let mut records = records.collect::<Vec<_>>();
    records.sort_by_key(|r| std::cmp::Reverse(key(r)));
    records
}

/// The directory containing `path`, if it has a non-empty one.
fn parent_dir(path: &Path) -> Option<&Path> {
    path.parent().filter(|dir| !dir.as_os_str().is_empty())
}

/// Copy a receipt image next to the ledger, under a fresh name. Returns the
/// path of the copy.
#[instrument(level = "debug", skip_all, fields(image = %image.path.display()))]
pub async fn store_receipt_image(ledger_path: &Path, image: &ReceiptImage) -> Result<PathBuf> {
    let dir = parent_dir(ledger_path)
        .map(|dir| dir.join(RECEIPTS_DIR))
        .unwrap_or_else(|| PathBuf::from(RECEIPTS_DIR));
    fs::create_dir_all(&dir)
        .await
        .with_context(|| format!("cannot create {:?}", dir.display()))?;

    let mut file_name = uuid::Uuid::new_v4().to_string();
    if let Some(ext) = image.path.extension().and_then(|ext| ext.to_str()) {
        file_name.push('.');
        file_name.push_str(&ext.to_lowercase());
    }
    let dest = dir.join(file_name);
    fs::write(&dest, &image.data).await.with_context(|| {
        format!(
            "cannot copy receipt {:?} to {:?}",
            image.path.display(),
            dest.display()
        )
    })?;
    Ok(dest)
}

/// Remove a stored receipt image that no record will point to.
pub async fn discard_receipt_image(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        warn!("Cannot remove unused receipt {:?}: {err}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::Category;

    fn expense(user: &str, date: (i32, u32, u32)) -> Expense {
        Expense {
            id: 0,
            user: user.to_owned(),
            amount: Decimal::new(500, 2),
            currency: "USD".to_owned(),
            expense_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            category: Category::Groceries,
            description: String::new(),
            amount_in_target_currency: None,
            receipt_image: None,
        }
    }

    #[test]
    fn ids_are_assigned_in_order() {
        let mut ledger = Ledger::default();
        assert_eq!(ledger.insert_expense(expense("ann", (2024, 1, 1))).id, 1);
        assert_eq!(ledger.insert_expense(expense("bob", (2024, 1, 1))).id, 2);
    }

    #[test]
    fn lookups_are_scoped_to_the_owner() {
        let mut ledger = Ledger::default();
        let id = ledger.insert_expense(expense("ann", (2024, 1, 1))).id;
        assert!(ledger.expense("ann", id).is_ok());
        assert_eq!(
            ledger.expense("bob", id),
            Err(NotFound {
                kind: RecordKind::Expense,
                id
            })
        );
        assert_eq!(
            ledger.income_mut("ann", 7).unwrap_err().to_string(),
            "income 7 not found"
        );
    }

    #[test]
    fn lists_are_newest_first() {
        let mut ledger = Ledger::default();
        ledger.insert_expense(expense("ann", (2024, 1, 1)));
        ledger.insert_expense(expense("ann", (2024, 3, 1)));
        ledger.insert_expense(expense("bob", (2024, 2, 1)));
        ledger.insert_expense(expense("ann", (2024, 3, 1)));
        let ids = ledger
            .expenses_for("ann")
            .iter()
            .map(|e| e.id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![4, 2, 1]);
    }

    #[test]
    fn target_currency_defaults_to_usd() {
        let mut ledger = Ledger::default();
        assert_eq!(ledger.target_currency("ann"), "USD");
        ledger.set_target_currency("ann", "EUR".to_owned());
        assert_eq!(ledger.target_currency("ann"), "EUR");
        assert_eq!(ledger.target_currency("bob"), "USD");
    }

    #[tokio::test]
    async fn ledgers_survive_a_round_trip_to_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("ledger.json");

        let empty = Ledger::load(&path).await.unwrap();
        assert!(empty.expenses.is_empty());

        let mut ledger = Ledger::default();
        ledger.set_target_currency("ann", "INR".to_owned());
        ledger.insert_expense(expense("ann", (2024, 5, 6)));
        ledger.save(&path).await.unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = Ledger::load(&path).await.unwrap();
        assert_eq!(loaded.expenses, ledger.expenses);
        assert_eq!(loaded.target_currency("ann"), "INR");
        assert_eq!(loaded.next_expense_id, 2);
    }

    #[tokio::test]
    async fn corrupt_ledgers_are_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, b"not json").await.unwrap();
        assert!(Ledger::load(&path).await.is_err());
    }

    #[test]
    fn ids_skip_past_records_without_a_counter() {
        let json = r#"{"expenses": [
            {"id": 1, "user": "ann", "amount": "5.00", "currency": "USD",
             "expense_date": "2024-01-01", "category": "Groceries",
             "description": "", "amount_in_target_currency": null,
             "receipt_image": null},
            {"id": 7, "user": "ann", "amount": "5.00", "currency": "USD",
             "expense_date": "2024-01-02", "category": "Groceries",
             "description": "", "amount_in_target_currency": null,
             "receipt_image": null}
        ]}"#;
        let mut ledger = serde_json::from_str::<Ledger>(json).unwrap();
        assert_eq!(ledger.next_expense_id, 0);
        assert_eq!(ledger.insert_expense(expense("ann", (2024, 1, 3))).id, 8);
        assert_eq!(ledger.insert_expense(expense("ann", (2024, 1, 3))).id, 9);
    }

    #[tokio::test]
    async fn receipt_images_are_copied_under_fresh_names() {
        let dir = tempfile::TempDir::new().unwrap();
        let image = ReceiptImage {
            path: dir.path().join("Receipt.JPG"),
            mime_type: "image/jpeg".to_owned(),
            data: b"jpeg bytes".to_vec(),
        };

        let copy = store_receipt_image(&dir.path().join("ledger.json"), &image)
            .await
            .unwrap();
        assert_eq!(copy.parent().unwrap(), dir.path().join("receipts"));
        assert_eq!(copy.extension().unwrap(), "jpg");
        assert_eq!(fs::read(&copy).await.unwrap(), b"jpeg bytes");

        discard_receipt_image(&copy).await;
        assert!(!copy.exists());
    }
}
