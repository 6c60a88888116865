use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, error, info, warn};

use crate::{
    context::RequestContext,
    error::{AggregatorError, Result, SchemeError},
    scheme::{
        Closure, Flag, NavDetails, RedeemSchemeDetails, SchemeDetails, SchemeFlags, SchemeKey,
        DEMAT_HOLDING,
    },
    storage::{
        models::{Catalog, CategoryRow, CompanyRow, ImportSummary, NavRow, SchemeRow},
        traits::{RegistrarSource, SchemeCatalog, SchemeFlagsSource},
    },
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const CUTOFF_FORMAT: &str = "%H:%M";
const NIL: &str = "Nil";

/// Column order of `mf_schemes`, shared by the upsert statement
const SCHEME_COLUMNS: [&str; 52] = [
    "comp_cd", "sch_cd", "cat_cd", "sch_desc", "sch_type",
    "start_date", "end_date", "nfo_exec_date",
    "purchase_cutoff", "redeem_cutoff", "switch_cutoff",
    "booster_stp_flg", "close_flg", "direct_flg", "dr_flg", "div_reinvest_flg",
    "etf_flg", "freedom_flg", "free_insure_flg", "multi_trans_flg", "offline_flg",
    "online_flg", "purchase_flg", "redeem_flg", "renewal_flg", "sip_flg",
    "special_interval_flg", "step_up_flg", "stp_out_flg", "switch_flg", "swp_flg",
    "target_fund_flg", "eatm_flg",
    "min_purchase_amt", "purchase_multi_amt", "min_sip_amt", "sip_multi_amt",
    "max_sub_amt", "max_sip_amt", "min_redeem_amt", "redeem_multi_amt",
    "min_redeem_units", "redeem_multi_units", "stp_out_min_amt", "stp_out_max_amt",
    "stp_min_holding_amt", "remarks",
    "nre_flg", "npnre_flg", "nro_flg", "npnro_flg", "ri_flg",
];

const SCHEME_FLAGS_QUERY: &str = "
    SELECT COALESCE(s.booster_stp_flg, 'N') AS booster_stp_flag,
           COALESCE(s.close_flg, 'N') AS close_flag,
           COALESCE(s.direct_flg, 'N') AS direct_scheme_flag,
           COALESCE(s.dr_flg, 'N') AS dr_flag,
           COALESCE(s.div_reinvest_flg, ' ') AS div_reinvest_flag,
           COALESCE(s.etf_flg, 'N') AS etf_flag,
           COALESCE(s.freedom_flg, 'N') AS freedom_flag,
           COALESCE(s.free_insure_flg, 'N') AS free_insure_flag,
           COALESCE(s.multi_trans_flg, 'N') AS multi_trans_allowed_flag,
           COALESCE(s.offline_flg, 'N') AS offline_flag,
           COALESCE(s.online_flg, 'N') AS online_flag,
           COALESCE(s.purchase_flg, 'N') AS purchase_flag,
           COALESCE(r.rec_flg, ' ') AS recommend_flag,
           COALESCE(s.redeem_flg, 'N') AS redeem_flag,
           COALESCE(s.renewal_flg, 'N') AS renewal_flag,
           COALESCE(s.sip_flg, 'N') AS sip_flag,
           COALESCE(s.special_interval_flg, 'N') AS special_interval_flag,
           COALESCE(s.step_up_flg, 'N') AS step_up_flag,
           COALESCE(s.stp_out_flg, 'N') AS stp_out_flag,
           COALESCE(s.switch_flg, 'N') AS switch_flag,
           COALESCE(s.swp_flg, 'N') AS swp_flag,
           COALESCE(s.target_fund_flg, 'N') AS target_fund_flag,
           s.end_date, s.purchase_cutoff, s.redeem_cutoff, s.switch_cutoff
    FROM mf_schemes s
    LEFT JOIN mf_recommendations r ON r.comp_cd = s.comp_cd AND r.sch_cd = s.sch_cd
    WHERE s.comp_cd = ?1 AND s.sch_cd = ?2";

type Clock = Arc<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// Scheme master backed by SQLite
#[derive(Clone)]
pub struct SqliteSchemeStore {
    conn: Arc<Mutex<Connection>>,
    clock: Clock,
}

impl std::fmt::Debug for SqliteSchemeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSchemeStore").finish_non_exhaustive()
    }
}

impl SqliteSchemeStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        info!("Opened scheme store at {}", path.as_ref().display());
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            clock: Arc::new(|| Local::now().naive_local()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Replace the wall clock used for cutoff and validity checks
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AggregatorError::Other(anyhow::anyhow!("scheme store connection poisoned")))
    }

    pub fn init_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS mf_companies (
                comp_cd INTEGER PRIMARY KEY,
                comp_name TEXT,
                registrar TEXT,
                folio_flg TEXT,
                eatm_flg TEXT
            );

            CREATE TABLE IF NOT EXISTS mf_categories (
                cat_cd TEXT PRIMARY KEY,
                eatm_flg TEXT
            );

            CREATE TABLE IF NOT EXISTS mf_schemes (
                comp_cd INTEGER NOT NULL,
                sch_cd TEXT NOT NULL,
                cat_cd TEXT,
                sch_desc TEXT,
                sch_type TEXT,
                start_date TEXT,
                end_date TEXT,
                nfo_exec_date TEXT,
                purchase_cutoff TEXT,
                redeem_cutoff TEXT,
                switch_cutoff TEXT,
                booster_stp_flg TEXT,
                close_flg TEXT,
                direct_flg TEXT,
                dr_flg TEXT,
                div_reinvest_flg TEXT,
                etf_flg TEXT,
                freedom_flg TEXT,
                free_insure_flg TEXT,
                multi_trans_flg TEXT,
                offline_flg TEXT,
                online_flg TEXT,
                purchase_flg TEXT,
                redeem_flg TEXT,
                renewal_flg TEXT,
                sip_flg TEXT,
                special_interval_flg TEXT,
                step_up_flg TEXT,
                stp_out_flg TEXT,
                switch_flg TEXT,
                swp_flg TEXT,
                target_fund_flg TEXT,
                eatm_flg TEXT,
                min_purchase_amt REAL,
                purchase_multi_amt REAL,
                min_sip_amt REAL,
                sip_multi_amt REAL,
                max_sub_amt REAL,
                max_sip_amt REAL,
                min_redeem_amt REAL,
                redeem_multi_amt REAL,
                min_redeem_units REAL,
                redeem_multi_units REAL,
                stp_out_min_amt REAL,
                stp_out_max_amt REAL,
                stp_min_holding_amt REAL,
                remarks TEXT,
                nre_flg TEXT,
                npnre_flg TEXT,
                nro_flg TEXT,
                npnro_flg TEXT,
                ri_flg TEXT,
                PRIMARY KEY (comp_cd, sch_cd)
            );

            CREATE TABLE IF NOT EXISTS mf_recommendations (
                comp_cd INTEGER NOT NULL,
                sch_cd TEXT NOT NULL,
                rec_flg TEXT,
                PRIMARY KEY (comp_cd, sch_cd)
            );

            CREATE TABLE IF NOT EXISTS mf_navs (
                comp_cd INTEGER NOT NULL,
                sch_cd TEXT NOT NULL,
                amfi_cd TEXT,
                nav_date TEXT,
                nav REAL,
                PRIMARY KEY (comp_cd, sch_cd)
            );

            CREATE TABLE IF NOT EXISTS mf_params (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                eatm_flg TEXT
            );",
        )?;
        Ok(())
    }

    pub fn upsert_company(&self, company: &CompanyRow) -> Result<()> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO mf_companies (comp_cd, comp_name, registrar, folio_flg, eatm_flg)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                company.comp_code,
                company.name,
                company.registrar,
                company.folio_flag.code(),
                company.eatm_flag.code(),
            ],
        )?;
        Ok(())
    }

    pub fn upsert_category(&self, category: &CategoryRow) -> Result<()> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO mf_categories (cat_cd, eatm_flg) VALUES (?1, ?2)",
            params![category.code, category.eatm_flag.code()],
        )?;
        Ok(())
    }

    pub fn upsert_scheme(&self, scheme: &SchemeRow) -> Result<()> {
        let placeholders = (1..=SCHEME_COLUMNS.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT OR REPLACE INTO mf_schemes ({}) VALUES ({})",
            SCHEME_COLUMNS.join(", "),
            placeholders
        );

        let date = |d: Option<NaiveDate>| d.map(|d| d.format(DATE_FORMAT).to_string());

        let conn = self.lock()?;
        conn.execute(
            &sql,
            params![
                scheme.comp_code,
                scheme.scheme_code,
                scheme.category_code,
                scheme.description,
                scheme.scheme_type,
                date(scheme.start_date),
                date(scheme.end_date),
                date(scheme.nfo_exec_date),
                scheme.purchase_cutoff,
                scheme.redeem_cutoff,
                scheme.switch_cutoff,
                scheme.booster_stp.code(),
                scheme.close.code(),
                scheme.direct.code(),
                scheme.dr.code(),
                scheme.div_reinvest.code(),
                scheme.etf.code(),
                scheme.freedom.code(),
                scheme.free_insure.code(),
                scheme.multi_trans.code(),
                scheme.offline.code(),
                scheme.online.code(),
                scheme.purchase.code(),
                scheme.redeem.code(),
                scheme.renewal.code(),
                scheme.sip.code(),
                scheme.special_interval.code(),
                scheme.step_up.code(),
                scheme.stp_out.code(),
                scheme.switch.code(),
                scheme.swp.code(),
                scheme.target_fund.code(),
                scheme.eatm.code(),
                scheme.min_purchase_amount,
                scheme.purchase_multi_amount,
                scheme.min_sip_amount,
                scheme.sip_multi_amount,
                scheme.max_sub_amount,
                scheme.max_sip_amount,
                scheme.min_redeem_amount,
                scheme.redeem_multi_amount,
                scheme.min_redeem_units,
                scheme.redeem_multi_units,
                scheme.stp_out_min_amount,
                scheme.stp_out_max_amount,
                scheme.stp_min_holding_amount,
                scheme.remarks,
                scheme.nre.code(),
                scheme.npnre.code(),
                scheme.nro.code(),
                scheme.npnro.code(),
                scheme.ri.code(),
            ],
        )?;

        match scheme.recommend.code() {
            Some(code) => conn.execute(
                "INSERT OR REPLACE INTO mf_recommendations (comp_cd, sch_cd, rec_flg) VALUES (?1, ?2, ?3)",
                params![scheme.comp_code, scheme.scheme_code, code],
            )?,
            None => conn.execute(
                "DELETE FROM mf_recommendations WHERE comp_cd = ?1 AND sch_cd = ?2",
                params![scheme.comp_code, scheme.scheme_code],
            )?,
        };

        Ok(())
    }

    pub fn upsert_nav(&self, nav: &NavRow) -> Result<()> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO mf_navs (comp_cd, sch_cd, amfi_cd, nav_date, nav)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                nav.comp_code,
                nav.scheme_code,
                nav.amfi_code,
                nav.nav_date.map(|d| d.format(DATE_FORMAT).to_string()),
                nav.nav,
            ],
        )?;
        Ok(())
    }

    pub fn set_param_eatm(&self, flag: Flag) -> Result<()> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO mf_params (id, eatm_flg) VALUES (1, ?1)",
            params![flag.code()],
        )?;
        Ok(())
    }

    /// Load a seed catalog
    pub fn import(&self, catalog: &Catalog) -> Result<ImportSummary> {
        if catalog.param_eatm != Flag::Unknown {
            self.set_param_eatm(catalog.param_eatm)?;
        }
        for company in &catalog.companies {
            self.upsert_company(company)?;
        }
        for category in &catalog.categories {
            self.upsert_category(category)?;
        }
        for scheme in &catalog.schemes {
            self.upsert_scheme(scheme)?;
            debug!("Upserted scheme {}", scheme.key());
        }
        for nav in &catalog.navs {
            self.upsert_nav(nav)?;
        }

        let summary = ImportSummary {
            companies: catalog.companies.len(),
            categories: catalog.categories.len(),
            schemes: catalog.schemes.len(),
            navs: catalog.navs.len(),
        };
        info!(
            "Imported {} companies, {} categories, {} schemes, {} navs",
            summary.companies, summary.categories, summary.schemes, summary.navs
        );
        Ok(summary)
    }

    /// Run `query` on the blocking pool, bounded by `ctx`
    async fn query<T, F>(&self, ctx: &RequestContext, name: &'static str, query: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, NaiveDateTime) -> Result<T> + Send + 'static,
    {
        debug!("START {}", name);

        let conn = Arc::clone(&self.conn);
        let now = (self.clock)();
        let result = ctx
            .run(async move {
                tokio::task::spawn_blocking(move || {
                    let conn = conn.lock().map_err(|_| {
                        AggregatorError::Other(anyhow::anyhow!("scheme store connection poisoned"))
                    })?;
                    query(&*conn, now)
                })
                .await?
            })
            .await;

        match &result {
            Ok(_) => debug!("END {}", name),
            Err(AggregatorError::Scheme(e)) => warn!("{}: {}", name, e),
            Err(e) => error!("{} failed: {}", name, e),
        }
        result
    }
}

fn flag(row: &Row<'_>, column: &str) -> rusqlite::Result<Flag> {
    let value: Option<String> = row.get(column)?;
    Ok(Flag::from(value.as_deref()))
}

/// "Y" unless `now` is past the end date at the given cutoff time
fn cutoff_flag(now: NaiveDateTime, end_date: Option<&str>, cutoff: Option<&str>) -> Flag {
    let (Some(end_date), Some(cutoff)) = (end_date, cutoff) else {
        return Flag::Yes;
    };

    match (
        NaiveDate::parse_from_str(end_date.trim(), DATE_FORMAT),
        NaiveTime::parse_from_str(cutoff.trim(), CUTOFF_FORMAT),
    ) {
        (Ok(date), Ok(time)) => Flag::from(now <= date.and_time(time)),
        _ => {
            warn!("Unparseable end date {} / cutoff {}, treating as open", end_date, cutoff);
            Flag::Yes
        }
    }
}

/// Reformat a stored `YYYY-MM-DD` date, "Nil" when absent
fn display_date(raw: Option<String>, format: &str) -> String {
    match raw {
        Some(raw) => NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map(|d| d.format(format).to_string())
            .unwrap_or(raw),
        None => NIL.to_string(),
    }
}

/// STP limits are expressed in units for demat holdings
fn stp_limit(amount: f64, nav: f64, holding_mode: &str) -> f64 {
    if holding_mode != DEMAT_HOLDING {
        return amount;
    }
    if nav == 0.0 {
        return 0.0;
    }
    ((amount / nav) * 10_000.0).round() / 10_000.0
}

#[async_trait]
impl SchemeFlagsSource for SqliteSchemeStore {
    async fn scheme_flags(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<SchemeFlags> {
        let key = key.clone();
        self.query(ctx, "scheme_flags", move |conn, now| {
            let flags = conn
                .query_row(SCHEME_FLAGS_QUERY, params![key.comp_code, key.scheme_code], |row| {
                    let end_date: Option<String> = row.get("end_date")?;
                    let purchase_cutoff: Option<String> = row.get("purchase_cutoff")?;
                    let redeem_cutoff: Option<String> = row.get("redeem_cutoff")?;
                    let switch_cutoff: Option<String> = row.get("switch_cutoff")?;

                    Ok(SchemeFlags {
                        booster_stp_flag: flag(row, "booster_stp_flag")?,
                        closure: Closure::from_close_flag(flag(row, "close_flag")?),
                        direct_scheme_flag: flag(row, "direct_scheme_flag")?,
                        dr_flag: flag(row, "dr_flag")?,
                        div_reinvest_flag: flag(row, "div_reinvest_flag")?,
                        etf_flag: flag(row, "etf_flag")?,
                        freedom_flag: flag(row, "freedom_flag")?,
                        free_insure_flag: flag(row, "free_insure_flag")?,
                        multi_trans_allowed_flag: flag(row, "multi_trans_allowed_flag")?,
                        offline_flag: flag(row, "offline_flag")?,
                        online_flag: flag(row, "online_flag")?,
                        purchase_allowed_flag: cutoff_flag(
                            now,
                            end_date.as_deref(),
                            purchase_cutoff.as_deref(),
                        ),
                        purchase_flag: flag(row, "purchase_flag")?,
                        recommend_flag: flag(row, "recommend_flag")?,
                        redeem_flag: flag(row, "redeem_flag")?,
                        redeem_allowed_flag: cutoff_flag(now, end_date.as_deref(), redeem_cutoff.as_deref()),
                        renewal_flag: flag(row, "renewal_flag")?,
                        sip_flag: flag(row, "sip_flag")?,
                        special_interval_flag: flag(row, "special_interval_flag")?,
                        step_up_flag: flag(row, "step_up_flag")?,
                        stp_out_flag: flag(row, "stp_out_flag")?,
                        switch_flag: flag(row, "switch_flag")?,
                        switch_allowed_flag: cutoff_flag(now, end_date.as_deref(), switch_cutoff.as_deref()),
                        swp_flag: flag(row, "swp_flag")?,
                        target_fund_flag: flag(row, "target_fund_flag")?,
                    })
                })
                .optional()?;

            flags.ok_or_else(|| SchemeError::NoSchemeFound.into())
        })
        .await
    }
}

#[async_trait]
impl RegistrarSource for SqliteSchemeStore {
    async fn company_registrar(&self, ctx: &RequestContext, comp_code: i64) -> Result<String> {
        self.query(ctx, "company_registrar", move |conn, _| {
            let registrar: Option<String> = conn
                .query_row(
                    "SELECT UPPER(COALESCE(registrar, '-')) FROM mf_companies WHERE comp_cd = ?1",
                    params![comp_code],
                    |row| row.get(0),
                )
                .optional()?;

            registrar.ok_or_else(|| SchemeError::NoRegistrarFound.into())
        })
        .await
    }
}

#[async_trait]
impl SchemeCatalog for SqliteSchemeStore {
    async fn scheme_details(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<SchemeDetails> {
        let key = key.clone();
        self.query(ctx, "scheme_details", move |conn, _| {
            let details = conn
                .query_row(
                    "SELECT COALESCE(min_purchase_amt, 0), COALESCE(purchase_multi_amt, 0),
                            COALESCE(min_sip_amt, 0), COALESCE(sip_multi_amt, 0),
                            COALESCE(max_sub_amt, 0), nfo_exec_date,
                            COALESCE(max_sip_amt, 0), COALESCE(sch_desc, ' '),
                            UPPER(COALESCE(sch_type, 'N'))
                     FROM mf_schemes
                     WHERE comp_cd = ?1 AND sch_cd = ?2",
                    params![key.comp_code, key.scheme_code],
                    |row| {
                        Ok(SchemeDetails {
                            min_purchase_amount: row.get(0)?,
                            multi_purchase_amount: row.get(1)?,
                            min_sip_amount: row.get(2)?,
                            multi_sip_amount: row.get(3)?,
                            max_sub_amount: row.get(4)?,
                            nfo_exec_date: display_date(row.get(5)?, "%d/%m/%Y"),
                            max_sip_amount: row.get(6)?,
                            scheme_desc: row.get(7)?,
                            scheme_type: row.get(8)?,
                        })
                    },
                )
                .optional()?;

            details.ok_or_else(|| SchemeError::NoSchemeFound.into())
        })
        .await
    }

    async fn redeem_scheme_details(
        &self,
        ctx: &RequestContext,
        key: &SchemeKey,
        holding_mode: &str,
        account_type: &str,
    ) -> Result<RedeemSchemeDetails> {
        let key = key.clone();
        let holding_mode = holding_mode.to_string();
        let account_type = account_type.to_string();

        self.query(ctx, "redeem_scheme_details", move |conn, now| {
            let details = conn
                .query_row(
                    "SELECT COALESCE(n.amfi_cd, ' ') AS amfi_cd, s.sch_desc, n.nav_date,
                            COALESCE(n.nav, 0) AS nav,
                            COALESCE(s.redeem_cutoff, '0') AS redeem_cutoff,
                            COALESCE(s.switch_cutoff, '0') AS switch_cutoff,
                            COALESCE(s.min_redeem_amt, 0) AS min_redeem_amt,
                            COALESCE(s.redeem_multi_amt, 0) AS redeem_multi_amt,
                            COALESCE(s.min_redeem_units, 0) AS min_redeem_units,
                            COALESCE(s.redeem_multi_units, 0) AS redeem_multi_units,
                            COALESCE(s.remarks, '0') AS remarks,
                            COALESCE(s.stp_out_min_amt, 0) AS stp_out_min_amt,
                            COALESCE(s.stp_out_max_amt, 0) AS stp_out_max_amt,
                            COALESCE(s.stp_min_holding_amt, 0) AS stp_min_holding_amt,
                            s.nre_flg, s.npnre_flg, s.nro_flg, s.npnro_flg, s.ri_flg
                     FROM mf_schemes s
                     LEFT JOIN mf_navs n ON n.comp_cd = s.comp_cd AND n.sch_cd = s.sch_cd
                     WHERE s.start_date <= ?3
                       AND datetime(s.end_date, '+1 day') >= ?3
                       AND s.comp_cd = ?1 AND s.sch_cd = ?2
                     ORDER BY s.sch_desc",
                    params![key.comp_code, key.scheme_code, now.format(DATETIME_FORMAT).to_string()],
                    |row| {
                        let nav: f64 = row.get("nav")?;
                        let account_flag_column = match account_type.as_str() {
                            "A" => Some("nre_flg"),
                            "B" => Some("npnre_flg"),
                            "C" => Some("nro_flg"),
                            "D" => Some("npnro_flg"),
                            "O" => Some("ri_flg"),
                            _ => None,
                        };
                        let account_type_allowed_flag = match account_flag_column {
                            Some(column) => match flag(row, column)? {
                                Flag::Unknown => Flag::Yes,
                                known => known,
                            },
                            None => Flag::Yes,
                        };

                        Ok(RedeemSchemeDetails {
                            amfi_code: row.get("amfi_cd")?,
                            scheme_desc: row.get::<_, Option<String>>("sch_desc")?.unwrap_or_default(),
                            nav_date: display_date(row.get("nav_date")?, "%d-%m-%Y"),
                            nav_value: nav,
                            redeem_cutoff_time: row.get("redeem_cutoff")?,
                            siso_cutoff_time: row.get("switch_cutoff")?,
                            min_redeem_amount: row.get("min_redeem_amt")?,
                            multi_redeem_amount: row.get("redeem_multi_amt")?,
                            min_redeem_units: row.get("min_redeem_units")?,
                            multi_redeem_units: row.get("redeem_multi_units")?,
                            scheme_remarks: row.get("remarks")?,
                            stp_min_amount: stp_limit(row.get("stp_out_min_amt")?, nav, &holding_mode),
                            stp_max_amount: stp_limit(row.get("stp_out_max_amt")?, nav, &holding_mode),
                            stp_min_holding_amount: row.get("stp_min_holding_amt")?,
                            account_type_allowed_flag,
                        })
                    },
                )
                .optional()?;

            details.ok_or_else(|| SchemeError::NoSchemeFound.into())
        })
        .await
    }

    async fn nav_details(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<NavDetails> {
        let key = key.clone();
        self.query(ctx, "nav_details", move |conn, _| {
            let nav = conn
                .query_row(
                    "SELECT COALESCE(amfi_cd, ' '), nav_date, COALESCE(nav, 0)
                     FROM mf_navs
                     WHERE comp_cd = ?1 AND sch_cd = ?2",
                    params![key.comp_code, key.scheme_code],
                    |row| {
                        Ok(NavDetails {
                            amfi_code: row.get(0)?,
                            nav_date: display_date(row.get(1)?, "%d-%m-%Y"),
                            nav_value: row.get(2)?,
                        })
                    },
                )
                .optional()?;

            nav.ok_or_else(|| SchemeError::NoNavFound.into())
        })
        .await
    }

    async fn company_folio(&self, ctx: &RequestContext, comp_code: i64) -> Result<String> {
        self.query(ctx, "company_folio", move |conn, _| {
            let folio: Option<String> = conn
                .query_row(
                    "SELECT COALESCE(folio_flg, 'N') FROM mf_companies WHERE comp_cd = ?1",
                    params![comp_code],
                    |row| row.get(0),
                )
                .optional()?;

            folio.ok_or_else(|| SchemeError::NoCompanyFound.into())
        })
        .await
    }

    async fn is_param_eatm_enabled(&self, ctx: &RequestContext) -> Result<bool> {
        self.query(ctx, "is_param_eatm_enabled", |conn, _| {
            let flag: Option<String> = conn
                .query_row("SELECT COALESCE(eatm_flg, 'N') FROM mf_params LIMIT 1", [], |row| row.get(0))
                .optional()?;

            Ok(Flag::from(flag.as_deref()).is_yes())
        })
        .await
    }

    async fn is_scheme_eatm_enabled(&self, ctx: &RequestContext, key: &SchemeKey) -> Result<bool> {
        let key = key.clone();
        self.query(ctx, "is_scheme_eatm_enabled", move |conn, _| {
            let flags: Option<(String, String, String)> = conn
                .query_row(
                    "SELECT COALESCE(c.eatm_flg, 'N'), COALESCE(s.eatm_flg, 'N'), COALESCE(g.eatm_flg, 'N')
                     FROM mf_companies c
                     JOIN mf_schemes s ON s.comp_cd = c.comp_cd
                     JOIN mf_categories g ON g.cat_cd = s.cat_cd
                     WHERE c.comp_cd = ?1 AND s.sch_cd = ?2",
                    params![key.comp_code, key.scheme_code],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )
                .optional()?;

            Ok(flags.is_some_and(|(company, scheme, category)| {
                [company, scheme, category].iter().all(|f| Flag::from(f.as_str()).is_yes())
            }))
        })
        .await
    }
}
