use state_machines::state_machine;

state_machine! {
    name: QueryMachine,
    state: QueryState,
    initial: Retrieved,
    states: [Retrieved, Validating, Answerable, NotAnswerable, NoContext],
    events {
        validate { transition: { from: Retrieved, to: Validating } }
        accept { transition: { from: Validating, to: Answerable } }
        reject { transition: { from: Validating, to: NotAnswerable } }
        bypass { transition: { from: Retrieved, to: NoContext } }
    }
}

pub fn retrieved() -> QueryMachine<(), Retrieved> {
    QueryMachine::new(())
}
