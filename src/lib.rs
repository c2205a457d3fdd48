//! # Marrow
//! Marrow is a satisfiability engine based on conflict-driven clause learning
//! (CDCL), extended with an optional background theory (a CDCL(T) loop in the
//! lazy-SMT style).
//!
//! The engine owns the Boolean core: the clause and atom store, two-watched
//! literal propagation, activity-based branching, First-UIP conflict analysis
//! with clause minimisation, non-chronological backtracking with restarts and
//! clause database reduction, and resolution proof reconstruction. Atomic
//! formulas, theories, input formats and the outer glue are supplied by the
//! host through the interfaces in [`theory`].
//!
//! # Pure SAT
//! Without a theory, the solver decides plain CNF problems. Non-zero `i32`
//! values can be used as formulas directly:
//! ```rust
//! use marrow_solver::theory::EmptyTheory;
//! use marrow_solver::CdclSolver;
//! use marrow_solver::Indefinite;
//! use marrow_solver::SatisfactionResult;
//!
//! let mut solver: CdclSolver<EmptyTheory<i32>> = CdclSolver::default();
//!
//! // (p \/ q) /\ !p
//! solver.add_clause(&[1, 2], ()).unwrap();
//! solver.add_clause(&[-1], ()).unwrap();
//!
//! let p = solver.intern_formula(&1);
//! let q = solver.intern_formula(&2);
//!
//! match solver.solve(&mut Indefinite) {
//!     SatisfactionResult::Satisfiable(satisfiable) => {
//!         assert!(!satisfiable.value(p));
//!         assert!(satisfiable.value(q));
//!     }
//!     _ => panic!("this problem is satisfiable"),
//! }
//! ```
//!
//! # Unsatisfiability certificates
//! When a problem is unsatisfiable the solver reports either a resolution
//! proof of the empty clause (reconstructed on demand from clause premises,
//! see [`proof`]) or, when solving under assumptions, the subset of the
//! assumptions responsible for the conflict.
//!
//! # Theories
//! A background theory implements [`theory::Theory`]: it is handed every
//! newly assigned literal at each propagation fixpoint and can learn clauses,
//! propagate literals with eager or deferred explanations, suggest decisions,
//! or raise conflicts carrying theory lemmas.

#[doc(hidden)]
pub mod asserts;

pub mod basic_types;
pub(crate) mod engine;
pub mod proof;
pub mod theory;

// We declare a private module with public use, so that all exports from the
// API are exports directly from the crate.
mod api;

pub use api::*;
