//! End-to-end action scenarios over a small market.
//!
//! Covers the shop flows (sell, buy, legacy buy), authorization ordering,
//! atomicity of failed actions and consistency of concurrent execution with
//! sequential execution.

#[cfg(test)]
mod tests {
    use crate::{
        execute,
        mocks::{
            create_agent, random_item, CountingState, FailingState, Fixture, Market,
            LISTING_PRICE, TRADABLE_SHEET_ID, UNTRADABLE_SHEET_ID,
        },
        rehearse, ActionContext, Delta, ExecutionConfig, Layer, MergeConflict, Outcome, Random,
        Snapshot, State,
    };
    use chronicle_types::{
        constants::{
            BUY3_OBSOLETE_INDEX, ERROR_INSUFFICIENT_BALANCE, ERROR_PRECONDITION_NOT_MET,
            MAX_INVENTORY_ITEMS, MAX_MEMO_LENGTH,
        },
        model::{AvatarState, MailKind, ShopState},
        Action, ActionError, Address, Buy, Currency, Event, Output, Precondition, Sell,
        Transaction, TransferAsset,
    };
    use rand::{rngs::StdRng, SeedableRng};

    fn run<'a, S: State>(
        fixture: &Fixture,
        state: &'a S,
        signer: Address,
        block_index: u64,
        action: &Action,
    ) -> Result<Outcome<'a, S>, ActionError> {
        let random = Random::for_action(block_index, 0, &signer, action);
        let ctx = ActionContext::new(state, signer, block_index, random);
        execute(ctx, &fixture.env(), action)
    }

    fn avatar(state: &Snapshot, address: &Address) -> AvatarState {
        Delta::new(state)
            .get_as::<AvatarState>(address)
            .unwrap()
            .unwrap()
    }

    fn shop(state: &Snapshot) -> ShopState {
        Delta::new(state)
            .get_as::<ShopState>(&Address::SHOP)
            .unwrap()
            .unwrap()
    }

    fn balance(state: &impl State, address: &Address, gold: &Currency) -> u128 {
        state.balance(address, gold).unwrap()
    }

    fn transfer(from: Address, to: Address, amount: u128, gold: &Currency) -> Transaction {
        Transaction::new(
            from,
            Action::TransferAsset(TransferAsset {
                sender: from,
                recipient: to,
                amount: gold.units(amount),
                memo: None,
            }),
        )
    }

    #[test]
    fn test_buy_routes_fee_and_proceeds() {
        let fixture = Fixture::default();
        let market = Market::new(&fixture, 10_000);
        let gold = &fixture.gold;
        let action = market.buy_action();

        let Outcome { delta, events } =
            run(&fixture, &market.snapshot, market.buyer, 5, &action).unwrap();
        let next = delta.commit();

        assert_eq!(balance(&next, &market.buyer, gold), gold.units(9_500).raw);
        assert_eq!(balance(&next, &Address::GOLD_CURRENCY, gold), gold.units(40).raw);
        assert_eq!(balance(&next, &market.seller, gold), gold.units(460).raw);
        assert_eq!(
            next.total_supply(gold).unwrap(),
            market.snapshot.total_supply(gold).unwrap()
        );
        assert_eq!(
            events,
            vec![Event::ProductSold {
                buyer_avatar: market.buyer_avatar,
                seller_agent: market.seller,
                product_id: market.listing.product_id,
                price: gold.units(LISTING_PRICE),
                fee: gold.units(40),
            }]
        );

        assert!(shop(&next).is_empty());
        let buyer = avatar(&next, &market.buyer_avatar);
        assert!(buyer.inventory.get(&market.listing.item.id).is_some());
        assert_eq!(buyer.trade_quest.bought, 1);
        assert_eq!(buyer.trade_quest.gold_traded, gold.units(LISTING_PRICE).raw);
        assert_eq!(buyer.updated_at, 5);
        assert!(matches!(
            buyer.mailbox.as_slice(),
            [mail] if matches!(&mail.kind, MailKind::Buyer { product_id, .. } if *product_id == market.listing.product_id)
        ));
        let seller = avatar(&next, &market.seller_avatar);
        assert_eq!(seller.trade_quest.sold, 1);
        assert_eq!(seller.trade_quest.gold_traded, gold.units(LISTING_PRICE).raw);
        assert!(matches!(
            seller.mailbox.as_slice(),
            [mail] if matches!(&mail.kind, MailKind::Seller { gold: proceeds, .. } if *proceeds == gold.units(460))
        ));
        assert_ne!(buyer.mailbox[0].id, seller.mailbox[0].id);
    }

    #[test]
    fn test_insufficient_balance_leaves_state_untouched() {
        let fixture = Fixture::default();
        let market = Market::new(&fixture, 0);
        let action = market.buy_action();

        let err = run(&fixture, &market.snapshot, market.buyer, 5, &action)
            .err()
            .unwrap();
        assert_eq!(
            err,
            ActionError::InsufficientBalance {
                address: market.buyer,
                required: fixture.gold.units(LISTING_PRICE),
                available: fixture.gold.zero(),
            }
        );

        let mut layer = Layer::new(&market.snapshot, fixture.env(), 5);
        let outputs = layer
            .execute(vec![Transaction::new(market.buyer, action)])
            .unwrap();
        assert!(matches!(
            &outputs[0],
            Output::Event(Event::ActionFailed { error_code, .. }) if *error_code == ERROR_INSUFFICIENT_BALANCE
        ));
        assert!(layer.changes().is_empty());
        let next = layer.commit();
        assert_eq!(next, market.snapshot);
        assert_eq!(next.root(), market.snapshot.root());
    }

    #[test]
    fn test_buy_into_full_inventory_leaves_state_untouched() {
        let fixture = Fixture::default();
        let market = Market::new(&fixture, 10_000);
        let mut rng = StdRng::seed_from_u64(17);
        let full = {
            let mut buyer = avatar(&market.snapshot, &market.buyer_avatar);
            while buyer.inventory.len() < MAX_INVENTORY_ITEMS {
                buyer
                    .inventory
                    .add(random_item(&mut rng, TRADABLE_SHEET_ID))
                    .unwrap();
            }
            let mut delta = Delta::new(&market.snapshot);
            delta.set_as(market.buyer_avatar, &buyer);
            delta.commit()
        };
        let action = market.buy_action();

        let err = run(&fixture, &full, market.buyer, 5, &action).err().unwrap();
        assert_eq!(
            err,
            Precondition::InventoryFull {
                capacity: MAX_INVENTORY_ITEMS
            }
            .into()
        );

        let mut layer = Layer::new(&full, fixture.env(), 5);
        let outputs = layer
            .execute(vec![Transaction::new(market.buyer, action)])
            .unwrap();
        assert!(matches!(
            &outputs[0],
            Output::Event(Event::ActionFailed { error_code, .. }) if *error_code == ERROR_PRECONDITION_NOT_MET
        ));
        assert!(layer.changes().is_empty());
        let next = layer.commit();
        assert_eq!(next, full);
        assert_eq!(shop(&next).len(), 1);
        assert_eq!(avatar(&next, &market.buyer_avatar).inventory.len(), MAX_INVENTORY_ITEMS);
    }

    #[test]
    fn test_unauthorized_buy_reads_nothing() {
        let fixture = Fixture::default();
        let market = Market::new(&fixture, 10_000);
        let action = market.buy_action();

        // Seller impersonating the buyer.
        let counting = CountingState::new(&market.snapshot);
        let err = run(&fixture, &counting, market.seller, 5, &action)
            .err()
            .unwrap();
        assert!(matches!(err, ActionError::Unauthorized(_)));
        assert_eq!(counting.reads(), 0);

        // A stranger spending from an avatar it does not control.
        let stranger = create_agent(99);
        let err = run(&fixture, &counting, stranger, 5, &action).err().unwrap();
        assert!(matches!(err, ActionError::Unauthorized(_)));
        assert_eq!(counting.reads(), 0);

        // Buyer and seller avatar are the same.
        let self_trade = Action::Buy(Buy {
            buyer_avatar: market.seller_avatar,
            seller_agent: market.seller,
            seller_avatar: market.seller_avatar,
            product_id: market.listing.product_id,
        });
        let err = run(&fixture, &counting, market.buyer, 5, &self_trade)
            .err()
            .unwrap();
        assert!(matches!(err, ActionError::Unauthorized(_)));
        assert_eq!(counting.reads(), 0);
    }

    #[test]
    fn test_successful_buy_reads_through_counting_state() {
        let fixture = Fixture::default();
        let market = Market::new(&fixture, 10_000);
        let counting = CountingState::new(&market.snapshot);
        run(&fixture, &counting, market.buyer, 5, &market.buy_action()).unwrap();
        assert!(counting.reads() > 0);
    }

    #[test]
    fn test_buy_requires_matching_listing() {
        let fixture = Fixture::default();
        let market = Market::new(&fixture, 10_000);
        let wrong_avatar = Action::Buy(Buy {
            buyer_avatar: market.buyer_avatar,
            seller_agent: market.seller,
            seller_avatar: market.seller.derive("avatar-state-1"),
            product_id: market.listing.product_id,
        });
        let err = run(&fixture, &market.snapshot, market.buyer, 5, &wrong_avatar)
            .err()
            .unwrap();
        assert_eq!(
            err,
            Precondition::ProductNotFound {
                seller_agent: market.seller,
                product_id: market.listing.product_id,
            }
            .into()
        );

        // Sold out after the first purchase.
        let mut layer = Layer::new(&market.snapshot, fixture.env(), 5);
        let tx = Transaction::new(market.buyer, market.buy_action());
        let outputs = layer.execute(vec![tx.clone(), tx]).unwrap();
        assert!(matches!(&outputs[0], Output::Event(Event::ProductSold { .. })));
        assert!(matches!(&outputs[2], Output::Event(Event::ActionFailed { .. })));
    }

    #[test]
    fn test_buyer_stage_is_required() {
        let config = ExecutionConfig {
            shop_required_stage: 50,
            ..ExecutionConfig::default()
        };
        let fixture = Fixture::new(config);
        let lenient = Fixture::default();
        let market = Market::new(&lenient, 10_000);

        let err = run(&fixture, &market.snapshot, market.buyer, 5, &market.buy_action())
            .err()
            .unwrap();
        assert_eq!(
            err,
            Precondition::StageNotCleared {
                required: 50,
                cleared: lenient.config.shop_required_stage,
            }
            .into()
        );
    }

    #[test]
    fn test_legacy_buy_is_obsoleted() {
        let fixture = Fixture::default();
        let market = Market::new(&fixture, 10_000);
        let action = market.buy3_action();

        let err = run(
            &fixture,
            &market.snapshot,
            market.buyer,
            BUY3_OBSOLETE_INDEX + 1,
            &action,
        )
        .err()
        .unwrap();
        assert_eq!(
            err,
            ActionError::Obsoleted {
                action: "buy3",
                obsolete_index: BUY3_OBSOLETE_INDEX,
                block_index: BUY3_OBSOLETE_INDEX + 1,
            }
        );

        // Still valid at the checkpoint itself.
        let Outcome { delta, .. } = run(
            &fixture,
            &market.snapshot,
            market.buyer,
            BUY3_OBSOLETE_INDEX,
            &action,
        )
        .unwrap();
        let next = delta.commit();
        assert_eq!(
            balance(&next, &Address::GOLD_CURRENCY, &fixture.gold),
            fixture.gold.units(40).raw
        );
        let price = fixture.gold.units(LISTING_PRICE).raw;
        let buyer = avatar(&next, &market.buyer_avatar);
        assert_eq!((buyer.trade_quest.bought, buyer.trade_quest.gold_traded), (1, price));
        let seller = avatar(&next, &market.seller_avatar);
        assert_eq!((seller.trade_quest.sold, seller.trade_quest.gold_traded), (1, price));
    }

    #[test]
    fn test_configured_fee_applies_to_current_buy_only() {
        let fixture = Fixture::new(ExecutionConfig {
            shop_fee_percent: 0,
            ..ExecutionConfig::default()
        });
        let market = Market::new(&fixture, 10_000);
        let gold = &fixture.gold;

        let Outcome { delta, .. } =
            run(&fixture, &market.snapshot, market.buyer, 5, &market.buy_action()).unwrap();
        let next = delta.commit();
        assert_eq!(balance(&next, &market.seller, gold), gold.units(500).raw);
        assert_eq!(balance(&next, &Address::GOLD_CURRENCY, gold), 0);

        let Outcome { delta, .. } =
            run(&fixture, &market.snapshot, market.buyer, 5, &market.buy3_action()).unwrap();
        let next = delta.commit();
        assert_eq!(balance(&next, &market.seller, gold), gold.units(460).raw);
    }

    #[test]
    fn test_sell_then_buy() {
        let fixture = Fixture::default();
        let mut rng = StdRng::seed_from_u64(7);
        let item = random_item(&mut rng, TRADABLE_SHEET_ID);
        let stage = fixture.config.shop_required_stage;
        let (seller, buyer) = (create_agent(20), create_agent(21));
        let mut avatars = (Address::default(), Address::default());
        let genesis = fixture.genesis(|delta| {
            avatars.0 = fixture.create_avatar(delta, seller, stage, [item.clone()]);
            avatars.1 = fixture.create_avatar(delta, buyer, stage, []);
            fixture.fund(delta, &buyer, 1_000);
        });
        let (seller_avatar, buyer_avatar) = avatars;

        let sell = Action::Sell(Sell {
            seller_avatar,
            item_id: item.id,
            price: fixture.gold.units(100),
        });
        let mut layer = Layer::new(&genesis, fixture.env(), 3);
        let outputs = layer.execute(vec![Transaction::new(seller, sell)]).unwrap();
        let Output::Event(Event::ProductRegistered { product_id, .. }) = outputs[0].clone() else {
            panic!("unexpected output {:?}", outputs[0]);
        };
        let listed = layer.commit();
        assert!(avatar(&listed, &seller_avatar).inventory.is_empty());
        let listing = shop(&listed);
        assert_eq!(listing.len(), 1);
        assert_eq!(listing.try_get(&seller, &product_id).unwrap().registered_at, 3);

        let buy = Action::Buy(Buy {
            buyer_avatar,
            seller_agent: seller,
            seller_avatar,
            product_id,
        });
        let Outcome { delta, .. } = run(&fixture, &listed, buyer, 4, &buy).unwrap();
        let next = delta.commit();
        assert!(shop(&next).is_empty());
        assert!(avatar(&next, &buyer_avatar).inventory.get(&item.id).is_some());
        assert_eq!(
            balance(&next, &seller, &fixture.gold),
            fixture.gold.units(92).raw
        );
    }

    #[test]
    fn test_sell_preconditions() {
        let fixture = Fixture::default();
        let mut rng = StdRng::seed_from_u64(8);
        let tradable = random_item(&mut rng, TRADABLE_SHEET_ID);
        let untradable = random_item(&mut rng, UNTRADABLE_SHEET_ID);
        let unknown = random_item(&mut rng, 1);
        let seller = create_agent(30);
        let mut seller_avatar = Address::default();
        let genesis = fixture.genesis(|delta| {
            seller_avatar = fixture.create_avatar(
                delta,
                seller,
                fixture.config.shop_required_stage,
                [tradable.clone(), untradable.clone(), unknown.clone()],
            );
        });
        let sell = |item_id, price| {
            Action::Sell(Sell {
                seller_avatar,
                item_id,
                price,
            })
        };
        let attempt = |action: Action| run(&fixture, &genesis, seller, 1, &action).err();

        assert_eq!(
            attempt(sell(untradable.id, fixture.gold.units(1))),
            Some(
                Precondition::ItemNotTradable {
                    sheet_id: UNTRADABLE_SHEET_ID
                }
                .into()
            )
        );
        let missing = uuid::Uuid::from_u128(1);
        assert_eq!(
            attempt(sell(missing, fixture.gold.units(1))),
            Some(Precondition::ItemNotFound { item_id: missing }.into())
        );
        assert_eq!(
            attempt(sell(tradable.id, fixture.gold.zero())),
            Some(Precondition::NonPositiveAmount.into())
        );
        assert!(matches!(
            attempt(sell(tradable.id, Currency::new("CRYSTAL", 18).units(1))),
            Some(ActionError::CurrencyMismatch { .. })
        ));
        assert!(matches!(
            attempt(sell(unknown.id, fixture.gold.units(1))),
            Some(ActionError::StateLoadFailure(_))
        ));
        assert!(matches!(
            run(&fixture, &genesis, create_agent(31), 1, &sell(tradable.id, fixture.gold.units(1)))
                .err(),
            Some(ActionError::Unauthorized(_))
        ));
        assert!(attempt(sell(tradable.id, fixture.gold.units(1))).is_none());
    }

    #[test]
    fn test_transfer_preconditions() {
        let fixture = Fixture::default();
        let (alice, bob) = (create_agent(40), create_agent(41));
        let genesis = fixture.genesis(|delta| fixture.fund(delta, &alice, 10));
        let attempt = |tx: Transaction| run(&fixture, &genesis, tx.signer, 1, &tx.action).err();

        assert_eq!(
            attempt(transfer(alice, alice, 1, &fixture.gold)),
            Some(Precondition::SelfTransfer(alice).into())
        );
        assert_eq!(
            attempt(transfer(alice, bob, 0, &fixture.gold)),
            Some(Precondition::NonPositiveAmount.into())
        );
        assert!(matches!(
            attempt(transfer(alice, bob, 11, &fixture.gold)),
            Some(ActionError::InsufficientBalance { .. })
        ));
        // Gold at a precision other than its declared one.
        assert_eq!(
            attempt(transfer(alice, bob, 1, &Currency::new("NCG", 18))),
            Some(ActionError::CurrencyMismatch {
                expected: fixture.gold.clone(),
                got: Currency::new("NCG", 18),
            })
        );
        // A currency nobody has declared.
        assert!(matches!(
            attempt(transfer(alice, bob, 1, &Currency::new("CRYSTAL", 18))),
            Some(ActionError::InsufficientBalance { .. })
        ));
        let mut chatty = transfer(alice, bob, 1, &fixture.gold);
        if let Action::TransferAsset(inner) = &mut chatty.action {
            inner.memo = Some("m".repeat(MAX_MEMO_LENGTH + 1));
        }
        assert_eq!(
            attempt(chatty),
            Some(
                Precondition::MemoTooLong {
                    max: MAX_MEMO_LENGTH
                }
                .into()
            )
        );
        assert!(attempt(transfer(alice, bob, 10, &fixture.gold)).is_none());
    }

    #[test]
    fn test_backend_failure_is_state_load_failure() {
        let fixture = Fixture::default();
        let (alice, bob) = (create_agent(50), create_agent(51));
        let tx = transfer(alice, bob, 1, &fixture.gold);
        let err = run(&fixture, &FailingState, alice, 1, &tx.action)
            .err()
            .unwrap();
        assert!(matches!(err, ActionError::StateLoadFailure(message) if message.contains("backend unavailable")));
    }

    #[test]
    fn test_disjoint_actions_merge_without_conflict() {
        let fixture = Fixture::default();
        let agents: Vec<Address> = (60..64).map(create_agent).collect();
        let genesis = fixture.genesis(|delta| {
            for agent in &agents {
                fixture.fund(delta, agent, 100);
            }
        });
        let first = transfer(agents[0], agents[1], 30, &fixture.gold);
        let second = transfer(agents[2], agents[3], 70, &fixture.gold);
        assert!(!rehearse(&first.signer, &first.action)
            .intersects(&rehearse(&second.signer, &second.action)));

        let (a, b) = std::thread::scope(|scope| {
            let a = scope.spawn(|| {
                run(&fixture, &genesis, first.signer, 1, &first.action)
                    .map(|outcome| outcome.delta.into_changes())
            });
            let b = scope.spawn(|| {
                run(&fixture, &genesis, second.signer, 1, &second.action)
                    .map(|outcome| outcome.delta.into_changes())
            });
            (a.join().unwrap().unwrap(), b.join().unwrap().unwrap())
        });
        let mut merged = a;
        merged.merge(b).unwrap();
        let concurrent = genesis.apply(&merged);

        let mut layer = Layer::new(&genesis, fixture.env(), 1);
        layer.execute(vec![first, second]).unwrap();
        assert_eq!(concurrent, layer.commit());
    }

    #[test]
    fn test_conflicting_actions_match_sequential_order() {
        let fixture = Fixture::default();
        let agents: Vec<Address> = (70..73).map(create_agent).collect();
        let genesis = fixture.genesis(|delta| {
            fixture.fund(delta, &agents[0], 100);
            fixture.fund(delta, &agents[1], 100);
        });
        let first = transfer(agents[0], agents[1], 60, &fixture.gold);
        let second = transfer(agents[1], agents[2], 150, &fixture.gold);
        assert!(rehearse(&first.signer, &first.action)
            .intersects(&rehearse(&second.signer, &second.action)));

        // Independent execution from the same base cannot be merged.
        let a = run(&fixture, &genesis, first.signer, 1, &first.action)
            .unwrap()
            .delta
            .into_changes();
        let b = run(&fixture, &genesis, second.signer, 1, &second.action);
        assert!(b.is_err());
        let c = run(
            &fixture,
            &genesis,
            agents[1],
            1,
            &transfer(agents[1], agents[2], 50, &fixture.gold).action,
        )
        .unwrap()
        .delta
        .into_changes();
        let mut merged = a.clone();
        assert!(matches!(
            merged.merge(c),
            Err(MergeConflict::Balance(address, _)) if address == agents[1]
        ));
        assert_eq!(merged, a);

        for order in [[&first, &second], [&second, &first]] {
            // Chained overlays, one per action.
            let mut chained: Delta<'_, Snapshot> = Delta::new(&genesis);
            for tx in order {
                let result = run(&fixture, &chained, tx.signer, 1, &tx.action)
                    .map(|outcome| outcome.delta.into_changes());
                if let Ok(changes) = result {
                    chained.apply(changes);
                }
            }
            let chained = chained.commit();

            let mut layer = Layer::new(&genesis, fixture.env(), 1);
            layer
                .execute(order.iter().map(|tx| (*tx).clone()).collect())
                .unwrap();
            let sequential = layer.commit();
            assert_eq!(chained, sequential);
            let total: u128 = agents
                .iter()
                .map(|agent| balance(&sequential, agent, &fixture.gold))
                .sum();
            assert_eq!(total, fixture.gold.units(200).raw);
        }
    }
}
