//! The governance façade.
//!
//! Each call resolves the caller, loads the collections it needs inside a
//! [`LedgerTxn`], runs one protocol transition and commits. Validation
//! no-ops write nothing; hard failures leave every collection untouched.
//!
//! Payoffs from bilateral transitions are settled against the token
//! contract's ledger in saga order: the new balances are published to the
//! token contract first, conditional on the version the old balances were
//! read at (abort on failure or conflict), then the local transaction
//! commits; if that commit fails, the previous balances are published back.

use std::fmt;
use std::sync::Arc;

use ocl_store::{IdentityProvider, InterContractInvoker, LedgerStore, LedgerTxn};
use ocl_types::{Clock, OrganisationId};

use crate::action::{ActionBook, ExecuteRequest, Transition};
use crate::bridge::{self, LinkedLedger, TokenContractEndpoint};
use crate::codec::{self, CollectionKey, ABSENT, EMPTY_COLLECTION};
use crate::error::GovernanceError;
use crate::incentive::IncentiveEngine;
use crate::ledger::{RegisterOutcome, TokenLedger};
use crate::operation::{
    CastBallotArgs, CreateVoteArgs, GetArgs, ListActionArgs, Operation, ProposeActionArgs,
    ReplyToListingArgs, Route,
};
use crate::params::GovernanceParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

/// Reply to an invocation: a human-readable message, plus raw bytes for `get`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub message: String,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
            payload: Vec::new(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: Status::Failure,
            message: message.into(),
            payload: Vec::new(),
        }
    }

    pub fn with_payload(payload: Vec<u8>) -> Self {
        Self {
            status: Status::Success,
            message: String::from_utf8_lossy(&payload).into_owned(),
            payload,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

pub struct GovernanceService {
    token_store: Arc<dyn LedgerStore>,
    action_store: Arc<dyn LedgerStore>,
    invoker: Arc<dyn InterContractInvoker>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    params: GovernanceParams,
}

impl GovernanceService {
    pub fn new(
        token_store: Arc<dyn LedgerStore>,
        action_store: Arc<dyn LedgerStore>,
        invoker: Arc<dyn InterContractInvoker>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        params: GovernanceParams,
    ) -> Self {
        Self {
            token_store,
            action_store,
            invoker,
            identity,
            clock,
            params,
        }
    }

    /// Both contracts in one process: the action contract reaches the token
    /// contract through a [`TokenContractEndpoint`] over `token_store`.
    pub fn in_process(
        token_store: Arc<dyn LedgerStore>,
        action_store: Arc<dyn LedgerStore>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
        params: GovernanceParams,
    ) -> Self {
        let invoker = Arc::new(TokenContractEndpoint::new(
            token_store.clone(),
            params.token_contract.clone(),
            params.channel.clone(),
        ));
        Self::new(token_store, action_store, invoker, identity, clock, params)
    }

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    /// Parse and run an operation by name.
    pub fn invoke(&self, name: &str, args: &[String]) -> Response {
        match Operation::parse(name, args) {
            Ok(op) => self.dispatch(op),
            Err(e) => {
                tracing::warn!(operation = name, error = %e, "rejected invocation");
                Response::failure(e.to_string())
            }
        }
    }

    /// Parse and run an operation addressed to a contract (`vote` or `action`).
    pub fn invoke_routed(&self, route: &str, name: &str, args: &[String]) -> Response {
        let parsed = route
            .parse::<Route>()
            .and_then(|route| Operation::parse_routed(route, name, args));
        match parsed {
            Ok(op) => self.dispatch(op),
            Err(e) => {
                tracing::warn!(route, operation = name, error = %e, "rejected invocation");
                Response::failure(e.to_string())
            }
        }
    }

    /// Run an operation, turning hard failures into a failure response.
    pub fn dispatch(&self, op: Operation) -> Response {
        let name = op.name();
        match self.execute(op) {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(operation = name, error = %e, "operation failed");
                Response::failure(e.to_string())
            }
        }
    }

    pub fn execute(&self, op: Operation) -> Result<Response, GovernanceError> {
        let span = tracing::info_span!("operation", name = op.name(), org = tracing::field::Empty);
        let _guard = span.enter();

        match op {
            Operation::Get(args) => self.get(&args),
            Operation::Reset { route } => self.reset(route),
            Operation::UpdateLedger { balances } => self.update_ledger(&balances),
            Operation::Register => self.register(&self.caller(&span)?),
            Operation::ProposeAction(args) => self.propose_action(&self.caller(&span)?, args),
            Operation::ListAction(args) => self.list_action(&self.caller(&span)?, args),
            Operation::ExecuteAction(request) => self.execute_action(&self.caller(&span)?, request),
            Operation::ReplyToListing(args) => self.reply_to_listing(&self.caller(&span)?, args),
            Operation::CreateVote(args) => self.create_vote(&self.caller(&span)?, args),
            Operation::CastBallot(args) => self.cast_ballot(&self.caller(&span)?, args),
            Operation::CloseVote { vote_id } => {
                self.caller(&span)?;
                self.close_vote(vote_id)
            }
        }
    }

    fn caller(&self, span: &tracing::Span) -> Result<OrganisationId, GovernanceError> {
        let caller = self.identity.current_organisation()?;
        span.record("org", caller.as_str());
        Ok(caller)
    }

    // ── Voting contract ─────────────────────────────────────────────────

    fn register(&self, caller: &OrganisationId) -> Result<Response, GovernanceError> {
        let mut txn = LedgerTxn::begin(self.token_store.as_ref());
        let mut ledger = codec::load_ledger(&mut txn)?;
        match ledger.register(caller, self.params.initial_balance) {
            RegisterOutcome::AlreadyRegistered => Ok(Response::success("User already registered")),
            RegisterOutcome::Registered => {
                codec::save_ledger(&mut txn, &ledger)?;
                txn.commit()?;
                tracing::info!(org = %caller, balance = self.params.initial_balance, "organisation registered");
                Ok(Response::success(format!(
                    "Organisation {caller} registered with {} tokens.",
                    self.params.initial_balance
                )))
            }
        }
    }

    /// Load the token ledger, registering the caller first when
    /// auto-registration is on. The flag reports whether it did.
    fn voting_ledger(
        &self,
        txn: &mut LedgerTxn<'_>,
        caller: &OrganisationId,
    ) -> Result<(TokenLedger, bool), GovernanceError> {
        let mut ledger = codec::load_ledger(txn)?;
        let registered = self.params.auto_register
            && ledger.register(caller, self.params.initial_balance) == RegisterOutcome::Registered;
        if registered {
            tracing::info!(org = %caller, "organisation auto-registered");
        }
        Ok((ledger, registered))
    }

    fn create_vote(&self, caller: &OrganisationId, args: CreateVoteArgs) -> Result<Response, GovernanceError> {
        let mut txn = LedgerTxn::begin(self.token_store.as_ref());
        if self.params.auto_register {
            let (ledger, registered) = self.voting_ledger(&mut txn, caller)?;
            if registered {
                codec::save_ledger(&mut txn, &ledger)?;
            }
        }
        let mut votes = codec::load_votes(&mut txn)?;
        let id = votes.create(
            caller,
            &args.title,
            args.duration_minutes,
            &args.description,
            self.clock.now(),
        );
        codec::save_votes(&mut txn, &votes)?;
        txn.commit()?;
        tracing::info!(vote_id = id, title = %args.title, duration_minutes = args.duration_minutes, "vote created");
        Ok(Response::success(format!("Vote {id} created: {}", args.title)))
    }

    fn cast_ballot(&self, caller: &OrganisationId, args: CastBallotArgs) -> Result<Response, GovernanceError> {
        let mut txn = LedgerTxn::begin(self.token_store.as_ref());
        let (ledger, registered) = self.voting_ledger(&mut txn, caller)?;
        let mut votes = codec::load_votes(&mut txn)?;
        let reply = votes.cast(&ledger, caller, args.vote_id, args.choice);
        if reply.mutated() {
            codec::save_votes(&mut txn, &votes)?;
        }
        if registered {
            codec::save_ledger(&mut txn, &ledger)?;
        }
        txn.commit()?;
        Ok(Response::success(reply.to_string()))
    }

    fn close_vote(&self, vote_id: u64) -> Result<Response, GovernanceError> {
        let mut txn = LedgerTxn::begin(self.token_store.as_ref());
        let mut ledger = codec::load_ledger(&mut txn)?;
        let mut votes = codec::load_votes(&mut txn)?;
        let reply = votes.close(&mut ledger, vote_id, self.clock.now(), &self.params);
        if reply.mutated() {
            codec::save_votes(&mut txn, &votes)?;
            codec::save_ledger(&mut txn, &ledger)?;
            txn.commit()?;
        }
        Ok(Response::success(reply.to_string()))
    }

    fn update_ledger(&self, balances: &[u8]) -> Result<Response, GovernanceError> {
        let ledger = bridge::replace_ledger(self.token_store.as_ref(), balances, None)?;
        tracing::info!(organisations = ledger.registered_count(), "token ledger replaced");
        Ok(Response::success("Ledger updated"))
    }

    // ── Action contract ─────────────────────────────────────────────────

    fn propose_action(&self, caller: &OrganisationId, args: ProposeActionArgs) -> Result<Response, GovernanceError> {
        let mut txn = LedgerTxn::begin(self.action_store.as_ref());
        let mut book = codec::load_book(&mut txn)?;
        let id = book.propose(caller, &args.acting, &args.action_name, &args.description, args.manual);
        codec::save_book(&mut txn, &book)?;
        txn.commit()?;
        tracing::info!(proposal_id = id, acting = %args.acting, action = %args.action_name, "action proposed");
        Ok(Response::success(format!(
            "Action proposed to organisation: {} (proposal {id})",
            args.acting
        )))
    }

    fn list_action(&self, caller: &OrganisationId, args: ListActionArgs) -> Result<Response, GovernanceError> {
        let mut txn = LedgerTxn::begin(self.action_store.as_ref());
        let mut book = codec::load_book(&mut txn)?;
        let id = book.list(caller, &args.action_name, &args.description);
        codec::save_book(&mut txn, &book)?;
        txn.commit()?;
        tracing::info!(listing_id = id, action = %args.action_name, "action listed");
        Ok(Response::success(format!("Action listed. (listing {id})")))
    }

    fn execute_action(&self, caller: &OrganisationId, request: ExecuteRequest) -> Result<Response, GovernanceError> {
        let mut txn = LedgerTxn::begin(self.action_store.as_ref());
        let mut book = codec::load_book(&mut txn)?;
        let transition = book.execute(caller, request, &self.params);
        let mutated = transition.reply.mutated();
        self.settle(txn, &book, transition, mutated)
    }

    fn reply_to_listing(&self, caller: &OrganisationId, args: ReplyToListingArgs) -> Result<Response, GovernanceError> {
        let mut txn = LedgerTxn::begin(self.action_store.as_ref());
        let mut book = codec::load_book(&mut txn)?;
        let transition = book.reply_to_listing(caller, args.index, args.decision);
        let mutated = transition.reply.mutated();
        self.settle(txn, &book, transition, mutated)
    }

    fn linked_ledger(&self) -> LinkedLedger<'_> {
        LinkedLedger::new(
            self.invoker.as_ref(),
            &self.params.token_contract,
            &self.params.channel,
        )
    }

    /// Persist a bilateral transition and settle its payoff.
    fn settle<R: fmt::Display>(
        &self,
        mut txn: LedgerTxn<'_>,
        book: &ActionBook,
        transition: Transition<R>,
        mutated: bool,
    ) -> Result<Response, GovernanceError> {
        let message = transition.reply.to_string();
        if !mutated {
            return Ok(Response::success(message));
        }
        codec::save_book(&mut txn, book)?;

        let Some(interaction) = transition.interaction else {
            txn.commit()?;
            return Ok(Response::success(message));
        };

        let linked = self.linked_ledger();
        let before = linked.fetch()?;
        let mut after = before.ledger.clone();
        IncentiveEngine::apply(&mut after, &interaction);
        codec::save_ledger(&mut txn, &after)?;

        linked.publish(&after, before.version)?;
        if let Err(e) = txn.commit() {
            tracing::error!(error = %e, "local commit failed after publishing balances; restoring token ledger");
            Self::restore(&linked, &before.ledger, &after);
            return Err(e.into());
        }
        Ok(Response::success(message))
    }

    /// Compensate a published settlement whose local commit failed. The old
    /// balances go back only if nobody has written the ledger since.
    fn restore(linked: &LinkedLedger<'_>, before: &TokenLedger, published: &TokenLedger) {
        let current = match linked.fetch() {
            Ok(current) => current,
            Err(e) => {
                tracing::error!(error = %e, "failed to read token ledger for restore; balances diverged");
                return;
            }
        };
        if current.ledger != *published {
            tracing::error!(version = current.version, "token ledger changed after publish; not restored");
            return;
        }
        if let Err(e) = linked.publish(before, current.version) {
            tracing::error!(error = %e, "failed to restore token ledger; balances diverged");
        }
    }

    // ── Shared ──────────────────────────────────────────────────────────

    fn store_for(&self, route: Route) -> &dyn LedgerStore {
        match route {
            Route::Vote => self.token_store.as_ref(),
            Route::Action => self.action_store.as_ref(),
        }
    }

    fn get(&self, args: &GetArgs) -> Result<Response, GovernanceError> {
        let value = match args.route {
            Some(route) => self.store_for(route).get_value(&args.key)?,
            None => match CollectionKey::parse(&args.key) {
                Some(CollectionKey::Operators | CollectionKey::Votes) => {
                    self.token_store.get_value(&args.key)?
                }
                Some(CollectionKey::ActionProposal | CollectionKey::ListAction) => {
                    self.action_store.get_value(&args.key)?
                }
                None => match self.action_store.get_value(&args.key)? {
                    Some(value) => Some(value),
                    None => self.token_store.get_value(&args.key)?,
                },
            },
        };
        Ok(Response::with_payload(value.unwrap_or_else(|| ABSENT.to_vec())))
    }

    fn reset(&self, route: Option<Route>) -> Result<Response, GovernanceError> {
        if route != Some(Route::Action) {
            let mut txn = LedgerTxn::begin(self.token_store.as_ref());
            txn.put(CollectionKey::Operators.as_str(), EMPTY_COLLECTION.to_vec());
            txn.put(CollectionKey::Votes.as_str(), EMPTY_COLLECTION.to_vec());
            txn.commit()?;
        }
        if route != Some(Route::Vote) {
            let mut txn = LedgerTxn::begin(self.action_store.as_ref());
            let mut book = match codec::load_book(&mut txn) {
                Ok(book) => book,
                Err(GovernanceError::Codec(e)) => {
                    tracing::warn!(error = %e, "action collections unreadable; resetting from sequences");
                    let (proposal_seq, listing_seq) = codec::load_sequences(&mut txn)?;
                    ActionBook {
                        proposal_seq,
                        listing_seq,
                        ..ActionBook::default()
                    }
                }
                Err(e) => return Err(e),
            };
            book.clear();
            codec::save_book(&mut txn, &book)?;
            txn.commit()?;
        }
        tracing::info!(route = route.map(Route::as_str).unwrap_or("all"), "collections reset");
        Ok(Response::success("Reset"))
    }
}
